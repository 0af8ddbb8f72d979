#![no_main]

use libfuzzer_sys::fuzz_target;
use simgraph_core::KGraph;

fuzz_target!(|data: &[u8]| {
    if let Ok(graph) = KGraph::read_from(&mut &data[..]) {
        let n = graph.size();
        for i in 0..n {
            assert!(graph.neighbors(i).iter().all(|&j| (j as usize) < n));
        }
    }
});
