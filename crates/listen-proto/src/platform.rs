use std::path::PathBuf;

pub fn data_dir() -> PathBuf {
    // On macOS and Linux, use ~/.local/share/listen/ (XDG standard)
    // instead of macOS Application Support for consistency
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".local")
            .join("share")
            .join("listen")
    }
    #[cfg(windows)]
    {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("listen")
    }
}

pub fn config_dir() -> PathBuf {
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("listen")
    }

    #[cfg(windows)]
    {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("listen")
    }
}

#[cfg(unix)]
fn binary_names(name: &str) -> Vec<String> {
    vec![name.to_string()]
}

#[cfg(windows)]
fn binary_names(name: &str) -> Vec<String> {
    vec![format!("{}.exe", name), name.to_string()]
}

fn find_beside_exe(names: &[String]) -> Option<PathBuf> {
    let current_exe = std::env::current_exe().ok()?;
    let dir = current_exe.parent()?;
    for name in names {
        let p = dir.join(name);
        if p.exists() {
            return Some(p);
        }
        let p = dir.join("external").join(name);
        if p.exists() {
            return Some(p);
        }
    }
    None
}

fn find_on_path(names: &[String]) -> Option<PathBuf> {
    let path = std::env::var("PATH").ok()?;
    #[cfg(unix)]
    let sep = ":";
    #[cfg(windows)]
    let sep = ";";
    for dir in path.split(sep) {
        for name in names {
            let p = PathBuf::from(dir).join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }
    None
}

/// Resolve the player binary named in the config.
///
/// An absolute or relative path is used as-is when it exists; a bare name is
/// looked up beside the current exe (and its `external/` folder), then on PATH.
pub fn find_player_binary(name: &str) -> Option<PathBuf> {
    let as_path = PathBuf::from(name);
    if as_path.components().count() > 1 {
        return as_path.exists().then_some(as_path);
    }
    let names = binary_names(name);
    find_beside_exe(&names).or_else(|| find_on_path(&names))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_are_namespaced() {
        assert!(data_dir().ends_with("listen"));
        assert!(config_dir().ends_with("listen"));
    }

    #[test]
    fn test_missing_player_path_is_none() {
        assert!(find_player_binary("/definitely/not/here/mplayer").is_none());
        assert!(find_player_binary("no-such-player-binary-4242").is_none());
    }
}
