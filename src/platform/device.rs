use serde::Deserialize;

/// Declared interface idiom of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceIdiom {
    #[default]
    Phone,
    Tablet,
    Other,
}

/// What the host reports about the device.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceProfile {
    #[serde(default)]
    pub idiom: DeviceIdiom,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub name: String,
}

impl DeviceProfile {
    pub fn phone() -> Self {
        Self {
            idiom: DeviceIdiom::Phone,
            model: "iPhone".to_string(),
            name: "iPhone".to_string(),
        }
    }

    /// Any single signal is enough: the declared idiom, or a marker in the
    /// model or user-visible device name.
    pub fn is_tablet_like(&self, markers: &[String]) -> bool {
        if self.idiom == DeviceIdiom::Tablet {
            return true;
        }
        markers
            .iter()
            .filter(|m| !m.is_empty())
            .any(|m| self.model.contains(m.as_str()) || self.name.contains(m.as_str()))
    }
}
