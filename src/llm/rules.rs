use std::path::Path;

use crate::FileType;

use super::{CategorizationClient, LlmError};

/// Extension table: (extensions, category, subcategory).
const RULES: &[(&[&str], &str, &str)] = &[
    (&["jpg", "jpeg", "png", "heic", "webp", "tif", "tiff", "bmp"], "Images", "Photos"),
    (&["gif"], "Images", "Animations"),
    (&["svg", "ai", "eps"], "Images", "Vector Graphics"),
    (&["psd", "xcf", "kra"], "Images", "Design Projects"),
    (&["mp4", "mkv", "mov", "avi", "webm", "wmv"], "Videos", "Movies"),
    (&["mp3", "flac", "wav", "ogg", "m4a", "aac", "opus"], "Music", "Songs"),
    (&["pdf"], "Documents", "PDF Documents"),
    (&["doc", "docx", "odt", "rtf"], "Documents", "Word Processing"),
    (&["txt", "md", "rst"], "Documents", "Text Notes"),
    (&["epub", "mobi", "azw3"], "Documents", "E-books"),
    (&["xls", "xlsx", "ods", "csv"], "Spreadsheets", "Data Tables"),
    (&["ppt", "pptx", "odp", "key"], "Presentations", "Slide Decks"),
    (&["zip", "rar", "7z", "tar", "gz", "bz2", "xz", "tgz"], "Archives", "Compressed Files"),
    (&["iso", "img", "dmg"], "Archives", "Disk Images"),
    (&["exe", "msi"], "Applications", "Windows Installers"),
    (&["deb", "rpm", "appimage", "flatpak"], "Applications", "Linux Packages"),
    (&["pkg", "app"], "Applications", "macOS Packages"),
    (&["apk"], "Applications", "Android Packages"),
    (&["rs", "py", "js", "ts", "c", "cpp", "h", "hpp", "java", "go", "rb", "cs", "kt", "swift"], "Source Code", "Programs"),
    (&["sh", "bash", "zsh", "ps1", "bat"], "Source Code", "Scripts"),
    (&["json", "yaml", "yml", "toml", "ini", "xml"], "Source Code", "Configuration"),
    (&["ttf", "otf", "woff", "woff2"], "Fonts", "Typefaces"),
    (&["torrent"], "Downloads", "Torrents"),
];

/// Offline categorization strategy backed by a fixed extension table.
///
/// Never touches the network. Answers in the same `<category> : <subcategory>`
/// line format a model would, so its output goes through the same parser.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleBasedClient;

impl RuleBasedClient {
    pub fn new() -> Self {
        Self
    }

    /// Returns the (category, subcategory) pair for an item.
    pub fn classify(file_name: &str, file_type: FileType) -> (String, String) {
        if file_type == FileType::Directory {
            return ("Folders".to_string(), "General".to_string());
        }

        let Some(extension) = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
        else {
            return ("Other".to_string(), "Unsorted Files".to_string());
        };

        RULES
            .iter()
            .find(|(extensions, _, _)| extensions.contains(&extension.as_str()))
            .map(|&(_, category, subcategory)| (category.to_string(), subcategory.to_string()))
            .unwrap_or_else(|| ("Other".to_string(), format!("{} Files", extension.to_uppercase())))
    }
}

impl CategorizationClient for RuleBasedClient {
    fn categorize_file(
        &self,
        file_name: &str,
        _file_path: Option<&Path>,
        file_type: FileType,
    ) -> Result<String, LlmError> {
        let (category, subcategory) = Self::classify(file_name, file_type);
        Ok(format!("{category} : {subcategory}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(name: &str) -> (String, String) {
        RuleBasedClient::classify(name, FileType::File)
    }

    #[test]
    fn known_extensions_map_to_table_entries() {
        assert_eq!(classify("IMG_0001.JPG"), ("Images".into(), "Photos".into()));
        assert_eq!(classify("album.tar.gz").0, "Archives");
        assert_eq!(classify("main.rs"), ("Source Code".into(), "Programs".into()));
        assert_eq!(classify("setup.exe").0, "Applications");
    }

    #[test]
    fn unknown_extension_gets_generic_subcategory() {
        assert_eq!(classify("data.xyz"), ("Other".into(), "XYZ Files".into()));
    }

    #[test]
    fn missing_extension_and_directories() {
        assert_eq!(classify("Makefile"), ("Other".into(), "Unsorted Files".into()));
        assert_eq!(
            RuleBasedClient::classify("photos.old", FileType::Directory),
            ("Folders".into(), "General".into())
        );
    }

    #[test]
    fn answers_in_model_line_format() {
        let line = RuleBasedClient
            .categorize_file("song.flac", None, FileType::File)
            .unwrap();
        assert_eq!(line, "Music : Songs");
    }
}
