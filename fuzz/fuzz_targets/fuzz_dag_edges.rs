//! Fuzz target for structure editing.
//!
//! Applies arbitrary add/remove edge sequences and checks that cycle
//! detection, topological ordering and sealing stay consistent.

#![no_main]

use arbitrary::Arbitrary;
use bn_common::VariableId;
use bn_core::{Dag, VariablesBuilder};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Op {
    Add { child: u8, parent: u8 },
    Remove { child: u8, parent: u8 },
}

#[derive(Debug, Arbitrary)]
struct Input {
    gaussian_mask: u16,
    variables: u8,
    ops: Vec<Op>,
}

fuzz_target!(|input: Input| {
    let n = (input.variables % 12) as usize + 1;
    let mut vb = VariablesBuilder::new();
    for i in 0..n {
        let name = format!("V{}", i);
        let _ = if input.gaussian_mask & (1 << i) != 0 {
            vb.new_gaussian(name)
        } else {
            vb.new_multinomial(name, 2)
        };
    }
    let mut dag = Dag::new(vb.build());
    let id = |raw: u8| VariableId(raw as usize % (n + 1));

    for op in input.ops.iter().take(64) {
        match *op {
            Op::Add { child, parent } => {
                let _ = dag.add_parent(id(child), id(parent));
            }
            Op::Remove { child, parent } => {
                let _ = dag.remove_parent(id(child), id(parent));
            }
        }
    }

    let cyclic = dag.contains_cycles();
    assert_eq!(cyclic, dag.topological_order().is_none());
    assert_eq!(cyclic, dag.seal().is_err());
});
