//! Database tag list interpretation

use n64_config::{CicType, PadType, SaveType, SystemRegion};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Save(SaveType),
    NoExpansionPak,
    ControllerPak,
    RumblePak,
    TransferPak,
    Rtc,
    Region(SystemRegion),
    Wide,
    Cic(CicType, Option<SystemRegion>),
}

impl Tag {
    /// Case-insensitive lookup of a single tag token
    fn parse(token: &str) -> Option<Self> {
        use CicType::*;
        use SystemRegion::{Ntsc, Pal};

        let tag = match token.to_ascii_lowercase().as_str() {
            "eeprom512" => Self::Save(SaveType::Eeprom512),
            "eeprom2k" => Self::Save(SaveType::Eeprom2k),
            "sram32k" => Self::Save(SaveType::Sram32k),
            "sram96k" => Self::Save(SaveType::Sram96k),
            "flash128k" => Self::Save(SaveType::Flash128k),
            "noepak" => Self::NoExpansionPak,
            "cpak" => Self::ControllerPak,
            "rpak" => Self::RumblePak,
            "tpak" => Self::TransferPak,
            "rtc" => Self::Rtc,
            "ntsc" => Self::Region(Ntsc),
            "pal" => Self::Region(Pal),
            "wide" => Self::Wide,
            "cic6101" => Self::Cic(Cic6101, Some(Ntsc)),
            "cic6102" => Self::Cic(Cic6102, Some(Ntsc)),
            "cic6103" => Self::Cic(Cic6103, Some(Ntsc)),
            "cic6105" => Self::Cic(Cic6105, Some(Ntsc)),
            "cic6106" => Self::Cic(Cic6106, Some(Ntsc)),
            "cic7101" => Self::Cic(Cic7101, Some(Pal)),
            "cic7102" => Self::Cic(Cic7102, Some(Pal)),
            "cic7103" => Self::Cic(Cic7103, Some(Pal)),
            "cic7105" => Self::Cic(Cic7105, Some(Pal)),
            "cic7106" => Self::Cic(Cic7106, Some(Pal)),
            "cic8303" => Self::Cic(Cic8303, None),
            "cic8401" => Self::Cic(Cic8401, None),
            "cic5167" => Self::Cic(Cic5167, None),
            "cicddus" => Self::Cic(CicDdus, None),
            "cic5101" => Self::Cic(Cic5101, None),
            _ => return None,
        };

        Some(tag)
    }
}

fn is_separator(c: char) -> bool {
    c == '|' || c.is_ascii_whitespace()
}

/// Settings described by a database entry's tag list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TagSettings {
    pub save_type: SaveType,
    pub region: Option<SystemRegion>,
    pub cic: Option<CicType>,
    pub no_expansion_pak: bool,
    pub controller_pak: bool,
    pub rumble_pak: bool,
    pub transfer_pak: bool,
    pub rtc: bool,
    pub wide: bool,
    /// Controller 1 mode implied by whichever pak tag appeared first
    pub preferred_pad: PadType,
}

impl TagSettings {
    /// Parse a tag list such as `sram32k|cpak|ntsc`. Unknown tags are logged and skipped.
    #[must_use]
    pub fn parse(tags: &str) -> Self {
        let mut settings = Self::default();

        for token in tags.split(is_separator).filter(|token| !token.is_empty()) {
            let Some(tag) = Tag::parse(token) else {
                log::warn!("Unknown tag: [{token}] (skipping)");
                continue;
            };

            match tag {
                Tag::Save(save_type) => settings.save_type = save_type,
                Tag::NoExpansionPak => settings.no_expansion_pak = true,
                Tag::ControllerPak => {
                    settings.controller_pak = true;
                    settings.prefer_pad(PadType::N64PadWithCpak);
                }
                Tag::RumblePak => {
                    settings.rumble_pak = true;
                    settings.prefer_pad(PadType::N64PadWithRpak);
                }
                Tag::TransferPak => {
                    settings.transfer_pak = true;
                    settings.prefer_pad(PadType::N64PadWithTpak);
                }
                Tag::Rtc => settings.rtc = true,
                Tag::Region(region) => settings.region = Some(region),
                Tag::Wide => settings.wide = true,
                Tag::Cic(cic, region) => {
                    settings.cic = Some(cic);
                    if region.is_some() {
                        settings.region = region;
                    }
                }
            }
        }

        // Chips that don't imply a region are NTSC unless a region tag said otherwise
        if settings.region.is_none() && settings.cic.is_some() {
            settings.region = Some(SystemRegion::Ntsc);
        }

        log::info!(
            "System: {}, Save Type: {}, CIC: {}, CPak: {}, RPak: {}, TPak: {}, RTC: {}, Mem: {}MB",
            settings.region.map_or("Unknown".into(), |region| region.to_string()),
            settings.save_type,
            settings.cic.map_or("Unknown".into(), |cic| cic.to_string()),
            settings.controller_pak,
            settings.rumble_pak,
            settings.transfer_pak,
            settings.rtc,
            if settings.no_expansion_pak { 4 } else { 8 }
        );

        settings
    }

    fn prefer_pad(&mut self, pad: PadType) {
        if self.preferred_pad == PadType::N64Pad {
            self.preferred_pad = pad;
        }
    }

    /// Region and CIC are both known.
    #[must_use]
    pub fn is_region_and_cic_known(&self) -> bool {
        self.region.is_some() && self.cic.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn sram_cpak_ntsc() {
        let settings = TagSettings::parse("sram32k|cpak|ntsc");
        assert_eq!(settings.save_type, SaveType::Sram32k);
        assert!(settings.controller_pak);
        assert_eq!(settings.preferred_pad, PadType::N64PadWithCpak);
        assert_eq!(settings.region, Some(SystemRegion::Ntsc));
        assert_eq!(settings.cic, None);
        assert!(!settings.is_region_and_cic_known());
    }

    #[test]
    fn case_insensitive_with_mixed_separators() {
        let settings = TagSettings::parse("EEPROM512 | Rpak|CIC6102  wide");
        assert_eq!(settings.save_type, SaveType::Eeprom512);
        assert!(settings.rumble_pak);
        assert!(settings.wide);
        assert_eq!(settings.cic, Some(CicType::Cic6102));
        assert_eq!(settings.region, Some(SystemRegion::Ntsc));
        assert!(settings.is_region_and_cic_known());
    }

    #[test]
    fn last_save_type_wins() {
        let settings = TagSettings::parse("eeprom2k|flash128k");
        assert_eq!(settings.save_type, SaveType::Flash128k);
    }

    #[test]
    fn first_pak_sets_preferred_pad() {
        let settings = TagSettings::parse("tpak|cpak|rpak");
        assert!(settings.transfer_pak && settings.controller_pak && settings.rumble_pak);
        assert_eq!(settings.preferred_pad, PadType::N64PadWithTpak);

        let settings = TagSettings::parse("rpak|cpak");
        assert_eq!(settings.preferred_pad, PadType::N64PadWithRpak);

        assert_eq!(TagSettings::parse("rtc").preferred_pad, PadType::N64Pad);
    }

    #[test]
    fn cic_implies_region_until_overridden() {
        assert_eq!(TagSettings::parse("cic7102").region, Some(SystemRegion::Pal));
        assert_eq!(TagSettings::parse("cic7102|ntsc").region, Some(SystemRegion::Ntsc));
        assert_eq!(TagSettings::parse("pal|cic6105").region, Some(SystemRegion::Ntsc));
    }

    #[test]
    fn regionless_cic_defaults_to_ntsc() {
        let settings = TagSettings::parse("cic8303");
        assert_eq!(settings.region, Some(SystemRegion::Ntsc));

        let settings = TagSettings::parse("cic5101|pal");
        assert_eq!(settings.region, Some(SystemRegion::Pal));

        assert_eq!(TagSettings::parse("sram96k").region, None);
    }

    #[test]
    fn unknown_tags_are_skipped() {
        let settings = TagSettings::parse("bogus|noepak||rtc");
        assert!(settings.no_expansion_pak);
        assert!(settings.rtc);
        assert_eq!(settings.save_type, SaveType::None);
    }
}
