//! CIC (boot chip) detection from IPL3 boot code checksums
//!
//! Each CIC variant pairs with its own IPL3, so a checksum of the boot code identifies the chip.
//! Aleck64 boot code is shorter than the regular IPL3, so two checksums are tried: the $40-$C00
//! sum first, then the full $40-$1000 sum.

use crate::header::BootcodeSums;
use n64_config::{CicType, SystemRegion};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CicRule {
    /// Same IPL3 ships in both an NTSC and a PAL chip; pick by region
    ByRegion { ntsc: CicType, pal: CicType },
    /// Chip is known but says nothing about region
    Chip(CicType),
    /// Chip only exists in one region, which overrides the region code
    ChipAndRegion(CicType, SystemRegion),
}

const X102: CicRule = CicRule::ByRegion { ntsc: CicType::Cic6102, pal: CicType::Cic7101 };
const X103: CicRule = CicRule::ByRegion { ntsc: CicType::Cic6103, pal: CicType::Cic7103 };
const X105: CicRule = CicRule::ByRegion { ntsc: CicType::Cic6105, pal: CicType::Cic7105 };
const X106: CicRule = CicRule::ByRegion { ntsc: CicType::Cic6106, pal: CicType::Cic7106 };

#[rustfmt::skip]
const SIGNATURES: &[(u64, CicRule)] = &[
    (0x000000a316adc55a, X102), // CIC-6102/7101 IPL3
    (0x000000a30dacd530, X102), // NOP'd out CRC check
    (0x000000039c981107, X102), // hcs64's CIC-6102 IPL3 replacement
    (0x000000d2828281b0, X102), // Unknown, used in some homebrew
    (0x000000d2be3c4486, X102), // Xeno Crisis custom IPL3
    (0x0000009acc31e644, X102), // HW1 IPL3 (Turok E3 prototype)
    (0x0000009474732e6b, X102), // IPL3 re-assembled with the GNU assembler (iQue)
    (0x000000a405397b05, CicRule::ChipAndRegion(CicType::Cic7102, SystemRegion::Pal)),
    (0x000000a3fc388adb, CicRule::ChipAndRegion(CicType::Cic7102, SystemRegion::Pal)), // NOP'd out CRC check
    (0x000000a0f26f62fe, CicRule::ChipAndRegion(CicType::Cic6101, SystemRegion::Ntsc)),
    (0x000000a0e96e72d4, CicRule::ChipAndRegion(CicType::Cic6101, SystemRegion::Ntsc)), // NOP'd out CRC check
    (0x000000a9229d7c45, X103), // CIC-x103 IPL3
    (0x000000a9199c8c1b, X103), // NOP'd out CRC check
    (0x000000271316d406, X103), // All zeros bar font (iQue Paper Mario)
    (0x000000f8b860ed00, X105), // CIC-x105 IPL3
    (0x000000f8af5ffcd6, X105), // NOP'd out CRC check
    (0x000000ba5ba4b8cd, X106), // CIC-x106 IPL3
    (0x0000012daafc8aab, CicRule::Chip(CicType::Cic5167)),
    (0x000000a9df4b39e1, CicRule::Chip(CicType::Cic8303)),
    (0x000000aa764e39e1, CicRule::Chip(CicType::Cic8401)),
    (0x000000abb0b739e1, CicRule::Chip(CicType::CicDdus)),
    (0x00000081ce470326, CicRule::Chip(CicType::Cic5101)), // CIC-5101 IPL3
    (0x000000827a47195a, CicRule::Chip(CicType::Cic5101)), // Kuru Kuru Fever
    (0x00000082551e4848, CicRule::Chip(CicType::Cic5101)), // Tower & Shaft
];

/// Region implied by the game code's region/language character.
#[must_use]
pub fn region_from_code(region_code: u8) -> SystemRegion {
    match region_code {
        // Germany, France, Netherlands, Italy, Gateway 64 (PAL), Europe, Spain, Australia,
        // Scandinavia, and three more European codes
        b'D' | b'F' | b'H' | b'I' | b'L' | b'P' | b'S' | b'U' | b'W' | b'X' | b'Y' | b'Z' => {
            SystemRegion::Pal
        }
        _ => SystemRegion::Ntsc,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootChipDetection {
    pub region: SystemRegion,
    pub cic: CicType,
    /// False if neither checksum matched and `cic` is only a guess based on region
    pub known: bool,
}

fn lookup(signature: u64) -> Option<CicRule> {
    SIGNATURES.iter().find(|&&(s, _)| s == signature).map(|&(_, rule)| rule)
}

#[must_use]
pub fn detect_boot_chip(region_code: u8, sums: BootcodeSums) -> BootChipDetection {
    let region = region_from_code(region_code);

    let rule = [sums.short, sums.long].into_iter().find_map(|signature| {
        let rule = lookup(signature);
        if rule.is_none() {
            log::debug!("Unknown CIC signature {signature:#018x}");
        }
        rule
    });

    let (rule, known) = match rule {
        Some(rule) => (rule, true),
        None => {
            log::info!("No CIC signature matched; defaulting based on region {region}");
            (X102, false)
        }
    };

    let (region, cic) = match rule {
        CicRule::ByRegion { ntsc, pal } => match region {
            SystemRegion::Ntsc => (region, ntsc),
            SystemRegion::Pal => (region, pal),
        },
        CicRule::Chip(cic) => (region, cic),
        CicRule::ChipAndRegion(cic, region) => (region, cic),
    };

    log::info!("Region: {region}, CIC: CIC-NUS-{cic}");

    BootChipDetection { region, cic, known }
}
