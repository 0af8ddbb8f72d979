use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use super::{KGraph, Node};
use crate::error::GraphError;

const MAGIC: &[u8; 8] = b"SGKGRAPH";
const VERSION: u32 = 1;

/// What a saved graph carries besides the edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveFormat {
    /// Edges and their distances.
    Full,
    /// Edges only; search recomputes distances through its oracle anyway.
    NoDist,
}

impl SaveFormat {
    fn flag(self) -> u8 {
        match self {
            SaveFormat::Full => 0,
            SaveFormat::NoDist => 1,
        }
    }

    fn from_flag(flag: u8) -> Result<Self, GraphError> {
        match flag {
            0 => Ok(SaveFormat::Full),
            1 => Ok(SaveFormat::NoDist),
            other => Err(GraphError::Corrupt(format!("unknown format flag {other}"))),
        }
    }
}

fn read_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_f32<R: Read>(reader: &mut R) -> io::Result<f32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(f32::from_le_bytes(buf))
}

impl KGraph {
    /// Serialize the graph.
    ///
    /// Format (little-endian):
    /// - Magic: "SGKGRAPH" (8 bytes)
    /// - Version: u32
    /// - Format flag: u8 (0 = with distances, 1 = ids only)
    /// - NumNodes: u32
    /// - Per node:
    ///   - Count: u32
    ///   - Ids: [u32; Count]
    ///   - Dists: [f32; Count] (with distances only)
    pub fn write_to<W: Write>(&self, writer: &mut W, format: SaveFormat) -> io::Result<()> {
        writer.write_all(MAGIC)?;
        writer.write_all(&VERSION.to_le_bytes())?;
        writer.write_all(&[format.flag()])?;
        writer.write_all(&(self.nodes.len() as u32).to_le_bytes())?;

        for node in &self.nodes {
            writer.write_all(&(node.ids.len() as u32).to_le_bytes())?;
            for &id in &node.ids {
                writer.write_all(&id.to_le_bytes())?;
            }
            if format == SaveFormat::Full {
                // graphs loaded without distances write zeros rather than a short record
                for i in 0..node.ids.len() {
                    let d = node.dists.get(i).copied().unwrap_or(0.0);
                    writer.write_all(&d.to_le_bytes())?;
                }
            }
        }
        Ok(())
    }

    /// Save the graph to a file, syncing it to disk before returning.
    pub fn save<P: AsRef<Path>>(&self, path: P, format: SaveFormat) -> Result<(), GraphError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer, format)?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        Ok(())
    }

    /// Load a graph from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, GraphError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    /// Load a graph from a reader, rejecting anything malformed.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, GraphError> {
        let mut magic = [0u8; 8];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(GraphError::InvalidMagic);
        }

        let version = read_u32(reader)?;
        if version != VERSION {
            return Err(GraphError::UnsupportedVersion(version));
        }

        let mut flag = [0u8; 1];
        reader.read_exact(&mut flag)?;
        let format = SaveFormat::from_flag(flag[0])?;

        let num_nodes = read_u32(reader)? as usize;
        // grow as we read; a corrupt count must not trigger a huge allocation
        let mut nodes = Vec::with_capacity(num_nodes.min(1 << 16));
        for node_id in 0..num_nodes {
            let count = read_u32(reader)? as usize;
            if count >= num_nodes.max(1) {
                return Err(GraphError::Corrupt(format!(
                    "node {node_id} has {count} neighbours in a graph of {num_nodes}"
                )));
            }
            let mut ids = Vec::with_capacity(count);
            for _ in 0..count {
                let id = read_u32(reader)?;
                if id as usize >= num_nodes {
                    return Err(GraphError::Corrupt(format!(
                        "node {node_id} links to {id}, out of range"
                    )));
                }
                ids.push(id);
            }
            let dists = match format {
                SaveFormat::Full => (0..count)
                    .map(|_| read_f32(reader))
                    .collect::<io::Result<Vec<f32>>>()?,
                SaveFormat::NoDist => Vec::new(),
            };
            nodes.push(Node { ids, dists });
        }

        let mut trailing = [0u8; 1];
        if reader.read(&mut trailing)? != 0 {
            return Err(GraphError::Corrupt("trailing bytes after graph".into()));
        }

        Ok(KGraph::from_nodes(nodes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kgraph::IndexParams;
    use crate::oracle::testing::VecIndexOracle;
    use tempfile::tempdir;

    fn sample_graph() -> KGraph {
        let data: Vec<Vec<f32>> = (0..30).map(|i| vec![i as f32, (i % 7) as f32]).collect();
        let params = IndexParams {
            k: 4,
            ..IndexParams::default()
        };
        KGraph::build(&VecIndexOracle { data: &data }, &params)
    }

    #[test]
    fn test_save_load_full() {
        let graph = sample_graph();
        let dir = tempdir().unwrap();
        let path = dir.path().join("graph.kg");

        graph.save(&path, SaveFormat::Full).unwrap();
        let loaded = KGraph::load(&path).unwrap();
        assert_eq!(loaded, graph);
    }

    #[test]
    fn test_save_load_without_distances() {
        let graph = sample_graph();
        let mut buf = Vec::new();
        graph.write_to(&mut buf, SaveFormat::NoDist).unwrap();

        let loaded = KGraph::read_from(&mut buf.as_slice()).unwrap();
        assert_eq!(loaded.size(), graph.size());
        for i in 0..graph.size() {
            assert_eq!(loaded.neighbors(i), graph.neighbors(i));
            assert!(loaded.nodes[i].dists.is_empty());
        }
    }

    #[test]
    fn test_rejects_bad_magic() {
        let mut buf = Vec::new();
        sample_graph().write_to(&mut buf, SaveFormat::NoDist).unwrap();
        buf[0] = b'X';
        assert!(matches!(
            KGraph::read_from(&mut buf.as_slice()),
            Err(GraphError::InvalidMagic)
        ));
    }

    #[test]
    fn test_rejects_unknown_version() {
        let mut buf = Vec::new();
        sample_graph().write_to(&mut buf, SaveFormat::NoDist).unwrap();
        buf[8..12].copy_from_slice(&7u32.to_le_bytes());
        assert!(matches!(
            KGraph::read_from(&mut buf.as_slice()),
            Err(GraphError::UnsupportedVersion(7))
        ));
    }

    #[test]
    fn test_rejects_truncated_and_trailing() {
        let mut buf = Vec::new();
        sample_graph().write_to(&mut buf, SaveFormat::Full).unwrap();

        let truncated = &buf[..buf.len() - 3];
        assert!(matches!(
            KGraph::read_from(&mut &truncated[..]),
            Err(GraphError::Io(_))
        ));

        let mut padded = buf.clone();
        padded.push(0);
        assert!(matches!(
            KGraph::read_from(&mut padded.as_slice()),
            Err(GraphError::Corrupt(_))
        ));
    }

    #[test]
    fn test_rejects_out_of_range_neighbor() {
        let graph = KGraph::from_nodes(vec![
            Node {
                ids: vec![1],
                dists: vec![],
            },
            Node {
                ids: vec![0],
                dists: vec![],
            },
        ]);
        let mut buf = Vec::new();
        graph.write_to(&mut buf, SaveFormat::NoDist).unwrap();
        // header is 17 bytes, node 0 count at 17..21, its first id at 21..25
        buf[21..25].copy_from_slice(&9u32.to_le_bytes());
        assert!(matches!(
            KGraph::read_from(&mut buf.as_slice()),
            Err(GraphError::Corrupt(_))
        ));
    }
}
