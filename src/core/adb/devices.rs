use serde::Serialize;

/// One entry from `adb devices -l`, optionally enriched with
/// properties read from the device itself.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub id: String,
    /// Connection state as reported by the daemon: `device`, `offline`,
    /// `unauthorized`, ...
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub android_version: Option<String>,
}

impl DeviceInfo {
    pub fn is_online(&self) -> bool {
        self.state == "device"
    }
}

/// Parses the output of `adb devices -l`.
///
/// The listing is line-oriented: a header line, then one device per
/// line as `<id> <state> [key:value ...]`. Daemon startup chatter
/// (lines beginning with `*`) and malformed lines are skipped rather
/// than failing the whole listing.
pub(crate) fn parse_device_list(output: &str) -> Vec<DeviceInfo> {
    let mut devices = Vec::new();

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("List of devices") || line.starts_with('*') {
            continue;
        }

        let mut fields = line.split_whitespace();
        let (id, state) = match (fields.next(), fields.next()) {
            (Some(id), Some(state)) => (id.to_string(), state.to_string()),
            _ => {
                log::debug!("skipping malformed device line: {line}");
                continue;
            }
        };

        let mut model = None;
        let mut product = None;
        for extra in fields {
            if let Some((key, value)) = extra.split_once(':') {
                match key {
                    "model" => model = Some(value.to_string()),
                    "product" => product = Some(value.to_string()),
                    _ => {}
                }
            }
        }

        devices.push(DeviceInfo {
            id,
            state,
            model,
            product,
            manufacturer: None,
            android_version: None,
        });
    }

    devices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_listing_with_extras() {
        let output = "List of devices attached\n\
                      emulator-5554          device product:sdk_gphone64 model:Pixel_6 device:emu64x transport_id:1\n\
                      R58M123ABC     unauthorized\n";
        let devices = parse_device_list(output);
        assert_eq!(devices.len(), 2);

        assert_eq!(devices[0].id, "emulator-5554");
        assert_eq!(devices[0].state, "device");
        assert_eq!(devices[0].model.as_deref(), Some("Pixel_6"));
        assert_eq!(devices[0].product.as_deref(), Some("sdk_gphone64"));
        assert!(devices[0].is_online());

        assert_eq!(devices[1].id, "R58M123ABC");
        assert_eq!(devices[1].state, "unauthorized");
        assert!(devices[1].model.is_none());
        assert!(!devices[1].is_online());
    }

    #[test]
    fn skips_header_chatter_and_malformed_lines() {
        let output = "* daemon not running; starting now at tcp:5037\n\
                      * daemon started successfully\n\
                      List of devices attached\n\
                      lonelytoken\n\
                      \n";
        assert!(parse_device_list(output).is_empty());
    }

    #[test]
    fn empty_listing_yields_no_devices() {
        assert!(parse_device_list("List of devices attached\n\n").is_empty());
    }
}
