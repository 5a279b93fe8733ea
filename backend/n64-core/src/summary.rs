//! User-facing summary of what auto-detection found

use crate::detect::DetectionOutcome;
use crate::header::CartridgeHeader;
use n64_config::{OptionKey, OptionStore, SaveType};
use std::fmt::{Display, Formatter};
use std::time::Duration;

const RECOGNIZED_DURATION: Duration = Duration::from_secs(6);
const UNRECOGNIZED_DURATION: Duration = Duration::from_secs(4);

const CHECK_MARK: char = '\u{2713}';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    lines: Vec<String>,
    duration: Duration,
}

impl LoadSummary {
    /// Build the summary from the header and the options as they stand after detection.
    #[must_use]
    pub fn build<O: OptionStore + ?Sized>(
        header: &CartridgeHeader,
        outcome: DetectionOutcome,
        options: &O,
    ) -> Self {
        let mut lines = vec!["Auto-detect:".to_string()];

        if let Some(cart_id) = header.cart_id.as_ref().filter(|id| !id.has_homebrew_marker()) {
            let (major, minor) = cart_id.revision_nibbles();
            lines.push(format!("[{}] v.{}.{minor}", cart_id.game_code(), major + 1));
        }

        if !header.internal_name.is_empty() {
            lines.push(format!("\"{}\"", header.internal_name));
        }

        if outcome.region_and_cic_known() {
            let region = options.system_region().map_or("?".into(), |region| region.to_string());
            let cic = options.cic_type().map_or("?".into(), |cic| cic.to_string());
            lines.push(format!("Region: {region} ({cic})"));
        } else {
            lines.push("Unknown Region/CIC".into());
        }

        if !outcome.metadata_known() {
            lines.push("ROM missing from database.".into());
            lines.push("You might not be able to save.".into());
            return Self { lines, duration: UNRECOGNIZED_DURATION };
        }

        let save_type = options.save_type();
        if save_type != SaveType::None {
            lines.push(format!("Save Type: {save_type}"));
        }

        for (key, label) in [
            (OptionKey::TransferPak, "Transfer Pak"),
            (OptionKey::ControllerPak, "Controller Pak"),
            (OptionKey::RumblePak, "Rumble Pak"),
            (OptionKey::Rtc, "RTC"),
            (OptionKey::NoExpansionPak, "Disable Exp. Pak"),
        ] {
            if options.flag(key) {
                lines.push(format!("{label} {CHECK_MARK}"));
            }
        }

        Self { lines, duration: RECOGNIZED_DURATION }
    }

    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// How long the host should show the summary
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl Display for LoadSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::header_chunk;
    use n64_config::{CicType, N64Options, SystemRegion};
    use test_log::test;

    fn header(game_code: &[u8; 4], revision: u8, name: &[u8]) -> CartridgeHeader {
        let mut chunk = header_chunk(game_code, revision);
        chunk[0x20..0x20 + name.len()].copy_from_slice(name);
        CartridgeHeader::parse(&chunk)
    }

    #[test]
    fn recognized_rom() {
        let options = N64Options {
            system_region: SystemRegion::Pal,
            cic_type: CicType::Cic7101,
            save_type: SaveType::Sram32k,
            controller_pak: true,
            rtc: true,
            ..N64Options::default()
        };

        let summary = LoadSummary::build(
            &header(b"NZLP", 0x10, b"THE LEGEND OF ZELDA"),
            DetectionOutcome::from_bits(0b11),
            &options,
        );

        assert_eq!(
            summary.to_string(),
            "Auto-detect:\n[NZLP] v.2.0\n\"THE LEGEND OF ZELDA\"\nRegion: PAL (7101)\n\
             Save Type: 256K SRAM\nController Pak \u{2713}\nRTC \u{2713}"
        );
        assert_eq!(summary.duration(), Duration::from_secs(6));
    }

    #[test]
    fn unrecognized_rom() {
        let summary = LoadSummary::build(
            &header(b"NXXE", 0x00, b""),
            DetectionOutcome::default(),
            &N64Options::default(),
        );

        assert_eq!(
            summary.lines(),
            [
                "Auto-detect:",
                "[NXXE] v.1.0",
                "Unknown Region/CIC",
                "ROM missing from database.",
                "You might not be able to save."
            ]
        );
        assert_eq!(summary.duration(), Duration::from_secs(4));
    }

    #[test]
    fn homebrew_omits_cart_id() {
        let summary = LoadSummary::build(
            &header(b"NEDA", 0x10, b"demo"),
            DetectionOutcome::from_bits(DetectionOutcome::METADATA_KNOWN),
            &N64Options::default(),
        );

        assert_eq!(summary.lines()[1], "\"demo\"");
        assert_eq!(summary.lines()[2], "Unknown Region/CIC");
        assert_eq!(summary.lines().len(), 3);
    }
}
