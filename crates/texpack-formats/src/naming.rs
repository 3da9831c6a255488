//! Texture identifiers derived from checksums
//!
//! The 64-bit checksum carries the texture CRC in its low half and the
//! palette CRC in its high half. Texture packs name their source images
//! after these, e.g. `GAME#1A2B3C4D#3#0_all.png`.

/// File name suffix of a hi-res texture cache
pub const HIRES_CACHE_SUFFIX: &str = "_HIRESTEXTURES.hts";

/// Texture CRC (low 32 bits)
pub const fn texture_crc(checksum: u64) -> u32 {
    checksum as u32
}

/// Palette CRC (high 32 bits), zero for non-palette textures
pub const fn palette_crc(checksum: u64) -> u32 {
    (checksum >> 32) as u32
}

/// Image file name a texture pack would use for this checksum
pub fn texture_file_name(ident: &str, checksum: u64) -> String {
    let crc = texture_crc(checksum);
    match palette_crc(checksum) {
        0 => format!("{ident}#{crc:08X}#3#0_all.png"),
        pal => format!("{ident}#{crc:08X}#3#0#{pal:08X}_ciByRGBA.png"),
    }
}

/// Game identifier from a cache file name (`GAME_HIRESTEXTURES.hts` -> `GAME`)
pub fn cache_ident(file_name: &str) -> Option<&str> {
    file_name
        .find(HIRES_CACHE_SUFFIX)
        .map(|end| &file_name[..end])
        .filter(|ident| !ident.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc_halves() {
        let checksum = 0x1122_3344_5566_7788;
        assert_eq!(texture_crc(checksum), 0x5566_7788);
        assert_eq!(palette_crc(checksum), 0x1122_3344);
    }

    #[test]
    fn test_file_name_without_palette() {
        assert_eq!(
            texture_file_name("MARIO64", 0x0000_0000_DEAD_BEEF),
            "MARIO64#DEADBEEF#3#0_all.png"
        );
    }

    #[test]
    fn test_file_name_with_palette() {
        assert_eq!(
            texture_file_name("ZELDA", 0x0000_00AB_0000_0001),
            "ZELDA#00000001#3#0#000000AB_ciByRGBA.png"
        );
    }

    #[test]
    fn test_cache_ident() {
        assert_eq!(
            cache_ident("SUPER MARIO 64_HIRESTEXTURES.hts"),
            Some("SUPER MARIO 64")
        );
        assert_eq!(cache_ident("_HIRESTEXTURES.hts"), None);
        assert_eq!(cache_ident("textures.hts"), None);
    }
}
