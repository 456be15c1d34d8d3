//! Project type detection by file signature (§4.9).

use std::collections::BTreeMap;
use std::path::Path;

use forge_protocol::preview::ProjectType;

const DOMINANT_UI_LIBRARIES: &[&str] = &["react", "react-dom"];

/// Inspects the project's file set for the manifests §4.9 names, in the
/// order it names them: backend dependency manifest first, then the
/// frontend package manifest (checked for a dominant UI library), then a
/// bare HTML entry. Matched by basename rather than full path, since the
/// generated tree always nests these under `backend/`/`frontend/`.
pub fn detect_project_type(files: &BTreeMap<String, String>) -> Option<ProjectType> {
    if find_by_basename(files, "requirements.txt").is_some() || find_by_basename(files, "pyproject.toml").is_some() {
        return Some(ProjectType::PythonService);
    }

    if let Some(package_json) = find_by_basename(files, "package.json") {
        return Some(if declares_dominant_ui_library(package_json) {
            ProjectType::ReactSpa
        } else {
            ProjectType::NodeService
        });
    }

    if find_by_basename(files, "index.html").is_some() {
        return Some(ProjectType::StaticSite);
    }

    None
}

fn find_by_basename<'a>(files: &'a BTreeMap<String, String>, basename: &str) -> Option<&'a String> {
    files
        .iter()
        .find(|(path, _)| Path::new(path.as_str()).file_name().is_some_and(|name| name == basename))
        .map(|(_, content)| content)
}

fn declares_dominant_ui_library(package_json: &str) -> bool {
    let Ok(parsed) = serde_json::from_str::<serde_json::Value>(package_json) else {
        return false;
    };
    let deps = ["dependencies", "devDependencies"]
        .iter()
        .filter_map(|section| parsed.get(section))
        .filter_map(|v| v.as_object());

    for dep_map in deps {
        if DOMINANT_UI_LIBRARIES.iter().any(|lib| dep_map.contains_key(*lib)) {
            return true;
        }
    }
    false
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn files(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn requirements_txt_detects_python_service() {
        let files = files(&[("requirements.txt", "flask==3.0"), ("app.py", "")]);
        assert_eq!(detect_project_type(&files), Some(ProjectType::PythonService));
    }

    #[test]
    fn package_json_with_react_detects_react_spa() {
        let files = files(&[("package.json", r#"{"dependencies":{"react":"18.0.0"}}"#)]);
        assert_eq!(detect_project_type(&files), Some(ProjectType::ReactSpa));
    }

    #[test]
    fn package_json_without_react_detects_node_service() {
        let files = files(&[("package.json", r#"{"dependencies":{"express":"4.0.0"}}"#)]);
        assert_eq!(detect_project_type(&files), Some(ProjectType::NodeService));
    }

    #[test]
    fn bare_html_entry_detects_static_site() {
        let files = files(&[("index.html", "<html></html>")]);
        assert_eq!(detect_project_type(&files), Some(ProjectType::StaticSite));
    }

    #[test]
    fn unrecognised_file_set_detects_nothing() {
        let files = files(&[("README.md", "hello")]);
        assert_eq!(detect_project_type(&files), None);
    }

    #[test]
    fn nested_requirements_txt_detects_python_service() {
        let files = files(&[("backend/requirements.txt", "flask==3.0"), ("backend/app.py", "")]);
        assert_eq!(detect_project_type(&files), Some(ProjectType::PythonService));
    }

    #[test]
    fn nested_package_json_with_react_detects_react_spa() {
        let files = files(&[("frontend/package.json", r#"{"dependencies":{"react":"18.0.0"}}"#)]);
        assert_eq!(detect_project_type(&files), Some(ProjectType::ReactSpa));
    }

    #[test]
    fn nested_index_html_detects_static_site() {
        let files = files(&[("frontend/index.html", "<html></html>")]);
        assert_eq!(detect_project_type(&files), Some(ProjectType::StaticSite));
    }
}
