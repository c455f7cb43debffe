use std::env;

pub const DEFAULT_DOUBLE_CLICK_TIME: u32 = 400;
pub const DEFAULT_DOUBLE_CLICK_DISTANCE: i32 = 5;

/// Process-wide toggles, read once when a display is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub use_ole2_dnd: bool,
    pub gl_fullscreen_workaround: bool,
    pub layered: bool,
    pub scale: Option<i32>,
    pub double_click_time: u32,
    pub double_click_distance: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            use_ole2_dnd: false,
            gl_fullscreen_workaround: false,
            layered: true,
            scale: None,
            double_click_time: DEFAULT_DOUBLE_CLICK_TIME,
            double_click_distance: DEFAULT_DOUBLE_CLICK_DISTANCE,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        config.use_ole2_dnd = lookup("USE_EXPERIMENTAL_OLE2_DND").is_some();
        config.gl_fullscreen_workaround = lookup("GL_FULLSCREEN_WORKAROUND").is_some();
        config.layered = lookup("LAYERED").map_or(true, |value| value != "0");

        if let Some(value) = lookup("SCALE") {
            match value.trim().parse::<i32>() {
                Ok(scale) if scale >= 1 => config.scale = Some(scale),
                _ => warn!("ignoring invalid SCALE value \"{}\"", value),
            }
        }

        config
    }

    pub fn with_double_click(
        mut self,
        time: u32,
        distance: i32,
    ) -> Self {
        self.double_click_time = time;
        self.double_click_distance = distance;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    fn lookup_in(vars: HashMap<&'static str, &'static str>) -> Config {
        Config::from_lookup(|name| vars.get(name).map(|value| value.to_string()))
    }

    #[test]
    fn absent_environment_yields_defaults() {
        assert_eq!(lookup_in(HashMap::new()), Config::default());
    }

    #[test]
    fn layered_is_disabled_only_by_zero() {
        assert!(!lookup_in(map!("LAYERED" => "0",)).layered);
        assert!(lookup_in(map!("LAYERED" => "no",)).layered);
    }

    #[test]
    fn invalid_scale_is_ignored() {
        assert_eq!(lookup_in(map!("SCALE" => "2",)).scale, Some(2));
        assert_eq!(lookup_in(map!("SCALE" => "0",)).scale, None);
        assert_eq!(lookup_in(map!("SCALE" => "big",)).scale, None);
    }

    #[test]
    fn presence_toggles_are_enabled_by_any_value() {
        let config = lookup_in(map!(
            "USE_EXPERIMENTAL_OLE2_DND" => "",
            "GL_FULLSCREEN_WORKAROUND" => "1",
        ));

        assert!(config.use_ole2_dnd);
        assert!(config.gl_fullscreen_workaround);
    }
}
