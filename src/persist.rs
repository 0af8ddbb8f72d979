//! On-disk form of a built index: the engine's graph file plus a `.meta`
//! sidecar holding the visible count as a decimal line.
//!
//! Both files are written to a temporary name, synced and renamed into
//! place. The graph goes first, so a crash between the two renames leaves a
//! sidecar that disagrees with the graph, which recovery rejects.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use simgraph_core::{GraphError, KGraph, SaveFormat};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid meta file: {0}")]
    InvalidMeta(String),

    #[error(
        "Inconsistent snapshot: graph has {graph_nodes} nodes, meta says {visible_count}, store has {entries} entries"
    )]
    Inconsistent {
        graph_nodes: usize,
        visible_count: usize,
        entries: usize,
    },
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Sidecar path for a graph file: `path` with `.meta` appended.
pub fn meta_path(path: &Path) -> PathBuf {
    with_suffix(path, ".meta")
}

fn sync_dir(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        File::open(dir)?.sync_all()?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

/// Write `graph` and its sidecar.
pub fn save(graph: &KGraph, visible_count: usize, path: &Path) -> Result<(), PersistError> {
    let graph_tmp = with_suffix(path, ".tmp");
    graph.save(&graph_tmp, SaveFormat::NoDist)?;
    fs::rename(&graph_tmp, path)?;

    let meta = meta_path(path);
    let meta_tmp = with_suffix(&meta, ".tmp");
    {
        let mut file = File::create(&meta_tmp)?;
        writeln!(file, "{visible_count}")?;
        file.sync_all()?;
    }
    fs::rename(&meta_tmp, &meta)?;

    sync_dir(path)?;
    Ok(())
}

/// Read the visible count from the sidecar of `path`.
pub fn read_meta(path: &Path) -> Result<usize, PersistError> {
    let text = fs::read_to_string(meta_path(path))?;
    let line = text.trim();
    line.parse()
        .map_err(|_| PersistError::InvalidMeta(format!("expected a count, found {line:?}")))
}

/// Read a snapshot back. Only the files themselves are validated here; the
/// caller checks the count against its entries.
pub fn load(path: &Path) -> Result<(KGraph, usize), PersistError> {
    let visible_count = read_meta(path)?;
    let graph = KGraph::load(path)?;
    Ok((graph, visible_count))
}
