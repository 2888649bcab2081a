//! CLI output formatting tests.

#[cfg(test)]
mod text_formatter_tests {
    use super::super::text::{TextFormatter, format_frequency, format_uptime};
    use gatewatch_core::{
        ChannelDirection, ChannelRecord, ChannelTechnology, LockStatus, PollResult, PollStatus,
    };
    use gatewatch_profiles::ProfileRegistry;
    use std::time::Duration;

    fn sample_result() -> PollResult {
        let mut result = PollResult::new("arris_sb8200", PollStatus::Ok);
        let mut ds = ChannelRecord::new(1, ChannelDirection::Downstream);
        ds.technology = ChannelTechnology::ScQam;
        ds.lock = LockStatus::Locked;
        ds.frequency_hz = Some(579_000_000);
        ds.power_dbmv = Some(2.5);
        ds.snr_db = Some(40.1);
        ds.corrected = Some(10);
        ds.uncorrected = Some(3);
        result.channels.push(ds);
        let mut us = ChannelRecord::new(3, ChannelDirection::Upstream);
        us.lock = LockStatus::NotLocked;
        us.frequency_hz = Some(16_400_000);
        result.channels.push(us);
        result.system_info.firmware_version = Some("AB01.02".to_string());
        result.system_info.uptime = Some(Duration::from_secs(3 * 86_400 + 4 * 3_600 + 5 * 60 + 6));
        result
    }

    #[test]
    fn test_format_frequency() {
        assert_eq!(format_frequency(Some(579_000_000)), "579.0");
        assert_eq!(format_frequency(Some(16_400_000)), "16.4");
        assert_eq!(format_frequency(None), "-");
    }

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(Duration::from_secs(0)), "00h 00m 00s");
        assert_eq!(format_uptime(Duration::from_secs(3_723)), "01h 02m 03s");
        assert_eq!(
            format_uptime(Duration::from_secs(7 * 86_400 + 34 * 60 + 12)),
            "7d 00h 34m 12s"
        );
    }

    #[test]
    fn test_format_result_plain() {
        let formatter = TextFormatter::new(false);
        let text = formatter.format_result("modem", &sample_result());

        assert!(text.starts_with("modem (arris_sb8200) ok"));
        assert!(text.contains("Firmware: AB01.02"));
        assert!(text.contains("Uptime:   3d 04h 05m 06s"));
        assert!(text.contains("Downstream (1 channels, 3 uncorrectable)"));
        assert!(text.contains("Upstream (1 channels)"));
        assert!(text.contains("579.0"));
        assert!(!text.contains('\x1b'));
    }

    #[test]
    fn test_format_result_colors_status() {
        let formatter = TextFormatter::new(true);

        let ok = formatter.format_result("modem", &sample_result());
        assert!(ok.contains("\x1b[32mok"));

        let failed = PollResult::failed("arris_sb8200", PollStatus::Failed, "connection refused");
        let text = formatter.format_result("modem", &failed);
        assert!(text.contains("\x1b[31mfailed"));
        assert!(text.contains("connection refused"));
        assert!(!text.contains("Downstream"));
    }

    #[test]
    fn test_format_result_notes() {
        let formatter = TextFormatter::new(false);
        let mut result = sample_result();
        result.status = PollStatus::Degraded;
        result.decode_error_count = 2;
        result.reauthenticated = true;

        let text = formatter.format_result("modem", &result);
        assert!(text.contains("degraded"));
        assert!(text.contains("2 record(s) could not be decoded"));
        assert!(text.contains("logged in again"));
    }

    #[test]
    fn test_format_profile_line() {
        let formatter = TextFormatter::new(false);
        let profile = ProfileRegistry::get("motorola_mb8600").unwrap();

        let line = formatter.format_profile_line(&profile, false);
        assert!(line.starts_with("motorola_mb8600"));
        assert!(line.contains("HNAP"));
        assert!(line.contains("delimited"));
        assert!(line.ends_with("built-in"));

        assert!(formatter.format_profile_line(&profile, true).ends_with("user"));
    }
}

#[cfg(test)]
mod json_formatter_tests {
    use super::super::json::JsonFormatter;
    use gatewatch_core::{ChannelDirection, ChannelRecord, PollResult, PollStatus};
    use gatewatch_store::ProfileCatalog;
    use serde_json::Value;

    #[test]
    fn test_format_results() {
        let mut result = PollResult::new("arris_sb8200", PollStatus::Ok);
        result.channels.push(ChannelRecord::new(1, ChannelDirection::Downstream));
        result.channels.push(ChannelRecord::new(2, ChannelDirection::Downstream));
        result.channels.push(ChannelRecord::new(1, ChannelDirection::Upstream));

        let formatter = JsonFormatter::new(false);
        let json = formatter.format_results(&[("modem".to_string(), result)]).unwrap();
        let parsed: Value = serde_json::from_str(&json).unwrap();

        let device = &parsed[0];
        assert_eq!(device["device"], "modem");
        assert_eq!(device["profile"], "arris_sb8200");
        assert_eq!(device["status"], "ok");
        assert_eq!(device["downstream"].as_array().unwrap().len(), 2);
        assert_eq!(device["upstream"].as_array().unwrap().len(), 1);
        assert!(device.get("error").is_none());
        assert!(device.get("rawCapture").is_none());
    }

    #[test]
    fn test_format_failed_result() {
        let result = PollResult::failed("generic", PollStatus::Failed, "timed out");
        let json = JsonFormatter::new(true)
            .format_results(&[("modem".to_string(), result)])
            .unwrap();
        assert!(json.contains('\n'));

        let parsed: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["status"], "failed");
        assert_eq!(parsed[0]["error"], "timed out");
    }

    #[test]
    fn test_format_profiles() {
        let catalog = ProfileCatalog::builtin();
        let json = JsonFormatter::new(false).format_profiles(&catalog).unwrap();
        let parsed: Value = serde_json::from_str(&json).unwrap();

        let profiles = parsed.as_array().unwrap();
        assert_eq!(profiles.len(), catalog.len());
        assert!(profiles.iter().all(|p| p["user"] == false));

        let mb8600 = profiles.iter().find(|p| p["id"] == "motorola_mb8600").unwrap();
        assert_eq!(mb8600["auth"], "HNAP");
        assert!(
            mb8600["capabilities"]
                .as_array()
                .unwrap()
                .iter()
                .any(|c| c == "restart")
        );
    }
}
