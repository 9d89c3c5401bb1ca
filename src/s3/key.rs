use std::path::{Component, Path};

/// Strip every leading `/` from a remote path argument
pub fn normalize_remote_path(remote: &str) -> &str {
    remote.trim_start_matches('/')
}

/// Build the object key for `file` found under `root`
///
/// The prefix's `/`-separated segments are joined with the file's path
/// relative to `root`, then cleaned: empty and `.` segments are dropped and
/// `..` removes the segment before it (or nothing, at the start). The key
/// never starts with `/` and uses `/` whatever the local separator is.
///
/// Keys are UTF-8. A file name that is not valid UTF-8 is converted lossily,
/// with invalid bytes replaced by `U+FFFD`.
pub fn map_key(root: &Path, file: &Path, prefix: &str) -> String {
    let relative = file.strip_prefix(root).unwrap_or(file);

    let mut segments: Vec<String> = Vec::new();
    for segment in prefix.split('/') {
        push_segment(&mut segments, segment);
    }

    for component in relative.components() {
        match component {
            Component::Normal(part) => push_segment(&mut segments, &part.to_string_lossy()),
            Component::ParentDir => push_segment(&mut segments, ".."),
            _ => {}
        }
    }

    segments.join("/")
}

fn push_segment(segments: &mut Vec<String>, segment: &str) {
    match segment {
        "" | "." => {}
        ".." => {
            segments.pop();
        }
        _ => segments.push(segment.to_string()),
    }
}
