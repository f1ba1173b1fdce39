use std::path::{Path, PathBuf};

use spaces_platform::extract_space_id;

pub const DEFAULT_FILE_NAME: &str = "recording.aac";
const PEEK_SUFFIX: &str = "-peek";

/// `<space id>.aac` with any `-peek` marker removed, or [`DEFAULT_FILE_NAME`]
/// when the URL names no Space.
pub fn output_file_name(url: &str) -> String {
    match extract_space_id(url) {
        Ok(id) => {
            let id = id.replace(PEEK_SUFFIX, "");
            if id.is_empty() {
                DEFAULT_FILE_NAME.to_string()
            } else {
                format!("{id}.aac")
            }
        }
        Err(_) => DEFAULT_FILE_NAME.to_string(),
    }
}

/// An explicit output path wins; otherwise the derived name, inside
/// `output_dir` when one is set.
pub fn output_path(output: Option<&Path>, output_dir: Option<&Path>, url: &str) -> PathBuf {
    if let Some(output) = output {
        return output.to_path_buf();
    }
    let file_name = output_file_name(url);
    match output_dir {
        Some(dir) => dir.join(file_name),
        None => PathBuf::from(file_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_from_space_url() {
        assert_eq!(
            output_file_name("https://x.com/i/spaces/1vOxwdQbRpXKB"),
            "1vOxwdQbRpXKB.aac"
        );
        assert_eq!(
            output_file_name("https://twitter.com/i/spaces/1vOxwdQbRpXKB-peek?s=20"),
            "1vOxwdQbRpXKB.aac"
        );
        assert_eq!(
            output_file_name("https://x.com/i/spaces/1vOxwdQbRpXKB/peek"),
            "1vOxwdQbRpXKB.aac"
        );
    }

    #[test]
    fn generic_name_without_space_id() {
        assert_eq!(output_file_name("https://x.com/home"), DEFAULT_FILE_NAME);
        assert_eq!(output_file_name("https://x.com/i/spaces/"), DEFAULT_FILE_NAME);
        assert_eq!(output_file_name("https://x.com/i/spaces/-peek"), DEFAULT_FILE_NAME);
    }

    #[test]
    fn output_path_precedence() {
        let url = "https://x.com/i/spaces/1abc";
        assert_eq!(
            output_path(Some(Path::new("a/b.aac")), Some(Path::new("dir")), url),
            PathBuf::from("a/b.aac")
        );
        assert_eq!(
            output_path(None, Some(Path::new("dir")), url),
            Path::new("dir").join("1abc.aac")
        );
        assert_eq!(output_path(None, None, url), PathBuf::from("1abc.aac"));
    }
}
