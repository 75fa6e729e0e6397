use std::path::Path;
use std::sync::Arc;

use jwalk::WalkDir;

use crate::document::Markup;
use crate::error::{Chainable, Result};
use crate::util::is_hidden;

/// Finds every document below `root`, returning their paths relative to
/// `root`, sorted. Hidden (`.`) and private (`_`) files and directories are
/// skipped, as is anything that isn't HTML or Markdown. A missing `root`
/// holds no documents.
pub fn discover(root: &Path) -> Result<Vec<Arc<Path>>> {
    if !root.is_dir() {
        log::warn!("post directory {} does not exist", root.display());
        return Ok(vec![]);
    }

    let walker = WalkDir::new(root)
        .follow_links(true)
        .skip_hidden(false)
        .process_read_dir(|depth, _, _, entries| {
            // The root itself comes through here too; only prune below it.
            if depth.is_none() {
                return;
            }

            entries.retain(|entry| entry.as_ref().map_or(true, |e| {
                !is_hidden(Path::new(&e.file_name))
            }));
        });

    let mut paths = vec![];
    for entry in walker {
        let entry = entry.chain_with(|| fault! {
            Io, "failed to read post directory",
            "path" => root.display(),
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };

        if Markup::from_path(relative).is_some() && !is_hidden(relative) {
            paths.push(Arc::from(relative));
        }
    }

    paths.sort();
    paths.dedup();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_documents() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for path in ["b.html", "a.md", "2024/c.markdown", "2024/d.htm", "e.css", ".f.html",
            "_drafts/g.html", ".git/h.html", "2024/_i.md"]
        {
            let path = root.join(path);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, "x").unwrap();
        }

        let found = discover(root).unwrap();
        let expected = ["2024/c.markdown", "2024/d.htm", "a.md", "b.html"];
        assert_eq!(found, expected.map(|p| Arc::<Path>::from(Path::new(p))));
    }

    #[test]
    fn private_or_hidden_root() {
        let dir = tempfile::tempdir().unwrap();
        for root in ["_posts", ".posts"] {
            let root = dir.path().join(root);
            std::fs::create_dir_all(root.join("_drafts")).unwrap();
            std::fs::write(root.join("a.html"), "x").unwrap();
            std::fs::write(root.join("_drafts/b.html"), "x").unwrap();

            let found = discover(&root).unwrap();
            assert_eq!(found, [Arc::<Path>::from(Path::new("a.html"))]);
        }
    }

    #[test]
    fn missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover(&dir.path().join("posts")).unwrap().is_empty());
    }
}
