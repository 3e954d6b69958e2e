/// Overrides the background video, e.g. `file:///tmp/beach.gif`.
pub const VIDEO_URI_ENV: &str = "NIMBUS_VIDEO_URI";

pub const DEFAULT_VIDEO_URI: &str = "asset:///clouds.gif";
pub const DEFAULT_LOGO_ASSET: &str = "logo.png";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoginConfig {
    pub video_uri: String,
    /// Asset name of the logo above the form.
    pub logo_asset: String,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            video_uri: DEFAULT_VIDEO_URI.into(),
            logo_asset: DEFAULT_LOGO_ASSET.into(),
        }
    }
}

impl LoginConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        match std::env::var(VIDEO_URI_ENV) {
            Ok(uri) if !uri.trim().is_empty() => {
                log::info!("background video from {VIDEO_URI_ENV}: {uri}");
                cfg.video_uri = uri;
            }
            _ => {}
        }
        cfg
    }
}
