use std::path::PathBuf;

xflags::xflags! {
    /// Render a directory of posts into a static site.
    cmd folio {
        /// The site root, holding `posts/`, `layouts/`, and `quire.toml`.
        required root: PathBuf
        /// Where to write the site. Defaults to `<ROOT>/_site`.
        optional -o, --output output: PathBuf
        /// Skip failing documents instead of aborting, and report them at the end.
        optional --best-effort
        /// Fail on code regions in languages with no highlighter.
        optional --strict-highlighting
        /// Number of worker threads. Defaults to the available parallelism.
        optional -j, --jobs jobs: usize
        /// Log at `debug` level rather than `info`, unless `RUST_LOG` is set.
        optional -v, --verbose
    }
}
