//! Built-in app registry and the file-open lookup table.

use serde_json::{json, Value};

use platform_host::{file_extension, leaf_name, normalize_virtual_path};

use crate::model::{AppId, Size, DEFAULT_WINDOW_HEIGHT, DEFAULT_WINDOW_WIDTH};

/// Plain-text editor app id; also the fallback for unknown file types.
pub const TEXT_EDITOR_APP_ID: &str = "aether-text";
/// Document editor app id, used for `txt` and `md`.
pub const DOCUMENT_APP_ID: &str = "scribe";
/// Spreadsheet app id.
pub const SPREADSHEET_APP_ID: &str = "grid";
/// Presentation app id.
pub const PRESENTATION_APP_ID: &str = "slides";
/// Image filter app id, used for raster images.
pub const IMAGE_FILTER_APP_ID: &str = "image-filter";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Registration data the window manager consults at open time.
pub struct AppDescriptor {
    /// App id.
    pub app_id: &'static str,
    /// Default window title.
    pub title: &'static str,
    /// Default window width.
    pub default_width: i32,
    /// Default window height.
    pub default_height: i32,
}

impl AppDescriptor {
    /// Default window size.
    pub fn default_size(&self) -> Size {
        Size::new(self.default_width, self.default_height)
    }
}

const fn app(
    app_id: &'static str,
    title: &'static str,
    default_width: i32,
    default_height: i32,
) -> AppDescriptor {
    AppDescriptor {
        app_id,
        title,
        default_width,
        default_height,
    }
}

const APP_REGISTRY: [AppDescriptor; 15] = [
    app("terminal", "Terminal", 600, 400),
    app(TEXT_EDITOR_APP_ID, "Aether Text", 800, 600),
    app(DOCUMENT_APP_ID, "Aether Scribe", 900, 700),
    app(SPREADSHEET_APP_ID, "Aether Grid", 1000, 600),
    app(PRESENTATION_APP_ID, "Aether Slides", 1000, 600),
    app("files", "Aether Files", 700, 500),
    app("chronos", "Chronos", 350, 500),
    app("abacus", "Abacus", 320, 480),
    app("lens", "Lens", 640, 520),
    app("wormhole", "Wormhole", 400, 600),
    app(IMAGE_FILTER_APP_ID, "Aether Native", 600, 600),
    app("system-monitor", "Monitor", 500, 400),
    app("cortex", "Cortex AI", 400, 600),
    app("epoch", "Epoch", 800, 600),
    app("settings", "Settings", 700, 500),
];

/// Returns the built-in app table.
pub fn app_registry() -> &'static [AppDescriptor] {
    &APP_REGISTRY
}

/// Source of per-app defaults for the window manager.
pub trait AppRegistry {
    /// Looks up the registration for `app_id`.
    fn descriptor(&self, app_id: &AppId) -> Option<AppDescriptor>;

    /// Title and size used when opening `app_id`; unknown apps get the generic defaults and their
    /// id as title.
    fn window_defaults(&self, app_id: &AppId) -> (String, Size) {
        match self.descriptor(app_id) {
            Some(descriptor) => (descriptor.title.to_string(), descriptor.default_size()),
            None => (
                app_id.to_string(),
                Size::new(DEFAULT_WINDOW_WIDTH, DEFAULT_WINDOW_HEIGHT),
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
/// [`AppRegistry`] backed by [`app_registry`].
pub struct BuiltinAppRegistry;

impl AppRegistry for BuiltinAppRegistry {
    fn descriptor(&self, app_id: &AppId) -> Option<AppDescriptor> {
        app_registry()
            .iter()
            .find(|descriptor| descriptor.app_id == app_id.as_str())
            .copied()
    }
}

/// Picks the app that opens a file, by extension (case-insensitive).
pub fn app_for_file(name: &str) -> AppId {
    let ext = file_extension(name).map(str::to_ascii_lowercase);
    let app_id = match ext.as_deref() {
        Some("txt" | "md") => DOCUMENT_APP_ID,
        Some("csv" | "grid") => SPREADSHEET_APP_ID,
        Some("pres") => PRESENTATION_APP_ID,
        Some("png" | "jpg" | "jpeg") => IMAGE_FILTER_APP_ID,
        _ => TEXT_EDITOR_APP_ID,
    };
    AppId::new(app_id)
}

#[derive(Debug, Clone, PartialEq)]
/// Everything needed to open a window for a file.
pub struct FileOpenRequest {
    /// App that handles the file.
    pub app_id: AppId,
    /// Window title (the file name).
    pub title: String,
    /// Launch payload `{"filePath": path}`.
    pub data: Value,
}

/// Builds the open request for a file path.
pub fn open_file_request(path: &str) -> FileOpenRequest {
    let path = normalize_virtual_path(path);
    let name = leaf_name(&path).to_string();
    FileOpenRequest {
        app_id: app_for_file(&name),
        title: name,
        data: json!({ "filePath": path }),
    }
}
