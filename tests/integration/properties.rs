//! Property tests over generated forests and random action sequences

use proptest::prelude::*;
use treegrid::fetcher::{NodeRecord, RootPage};
use treegrid::store::ToggleOutcome;
use treegrid::{flatten, NodeId, RequestToken, TreeStore};

fn name(index: usize) -> NodeId {
    NodeId::new(format!("n{}", index))
}

/// Parent index per node; node 0 is always a root and parents precede children
fn forest_strategy() -> impl Strategy<Value = Vec<Option<usize>>> {
    (1..40usize).prop_flat_map(|count| {
        (0..count)
            .map(|i| {
                if i == 0 {
                    Just(None).boxed()
                } else {
                    prop::option::weighted(0.8, 0..i).boxed()
                }
            })
            .collect::<Vec<_>>()
    })
}

struct Forest {
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
    depth: Vec<usize>,
}

impl Forest {
    fn new(parents: &[Option<usize>]) -> Self {
        let mut children = vec![Vec::new(); parents.len()];
        let mut roots = Vec::new();
        let mut depth = vec![0; parents.len()];
        for (i, parent) in parents.iter().enumerate() {
            match parent {
                Some(p) => {
                    children[*p].push(i);
                    depth[i] = depth[*p] + 1;
                }
                None => roots.push(i),
            }
        }
        Self {
            children,
            roots,
            depth,
        }
    }

    fn record(&self, index: usize) -> NodeRecord<usize> {
        NodeRecord::new(name(index), index, !self.children[index].is_empty())
    }

    fn subtree_size(&self, index: usize) -> usize {
        1 + self.children[index]
            .iter()
            .map(|child| self.subtree_size(*child))
            .sum::<usize>()
    }

    fn preorder(&self) -> Vec<(NodeId, usize)> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.roots.iter().rev().copied().collect();
        while let Some(i) = stack.pop() {
            out.push((name(i), self.depth[i]));
            stack.extend(self.children[i].iter().rev().copied());
        }
        out
    }

    /// Store with every node fetched and expanded
    fn fully_expanded(&self) -> TreeStore<usize> {
        let mut store = TreeStore::new();
        let token = store.begin_root_page(0, self.roots.len());
        store.apply_root_page(
            token,
            RootPage {
                items: self.roots.iter().map(|r| self.record(*r)).collect(),
                total: self.roots.len(),
            },
        );

        let mut stack = self.roots.clone();
        while let Some(i) = stack.pop() {
            if self.children[i].is_empty() {
                continue;
            }
            match store.toggle_expand(&name(i)).unwrap() {
                ToggleOutcome::FetchRequired { token } => {
                    let records = self.children[i].iter().map(|c| self.record(*c)).collect();
                    store.apply_children_fetched(&name(i), token, records);
                }
                other => panic!("expected fetch for n{}, got {:?}", i, other),
            }
            stack.extend(self.children[i].iter().copied());
        }
        store
    }
}

#[derive(Debug, Clone)]
enum Op {
    Toggle(usize),
    Resolve { slot: usize, children: usize, fail: bool },
    Insert(usize),
    Remove(usize),
    CollapseAll,
    LoadPage(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..64usize).prop_map(Op::Toggle),
        4 => (0..8usize, 0..4usize, any::<bool>())
            .prop_map(|(slot, children, fail)| Op::Resolve { slot, children, fail }),
        1 => (0..64usize).prop_map(Op::Insert),
        1 => (0..64usize).prop_map(Op::Remove),
        1 => Just(Op::CollapseAll),
        1 => (0..3usize).prop_map(Op::LoadPage),
    ]
}

const ROOT_UNIVERSE: usize = 6;
const PAGE_SIZE: usize = 3;

fn load_page(store: &mut TreeStore<usize>, page: usize) {
    let token = store.begin_root_page(page, PAGE_SIZE);
    let items = (page * PAGE_SIZE..(page * PAGE_SIZE + PAGE_SIZE).min(ROOT_UNIVERSE))
        .map(|r| NodeRecord::new(format!("r{}", r), r, true))
        .collect();
    store.apply_root_page(
        token,
        RootPage {
            items,
            total: ROOT_UNIVERSE,
        },
    );
}

proptest! {
    #[test]
    fn prop_flatten_depth_matches_parent_chain(parents in forest_strategy()) {
        let forest = Forest::new(&parents);
        let store = forest.fully_expanded();
        let rows = flatten(&store);

        let actual: Vec<(NodeId, usize)> = rows
            .iter()
            .map(|row| (row.node_id.clone(), row.depth))
            .collect();
        prop_assert_eq!(&actual, &forest.preorder());
        for row in &rows {
            prop_assert_eq!(store.depth(&row.node_id), Some(row.depth));
            prop_assert_eq!(store.ancestors(&row.node_id).len(), row.depth);
        }
    }

    #[test]
    fn prop_flatten_is_deterministic(parents in forest_strategy()) {
        let forest = Forest::new(&parents);
        let store = forest.fully_expanded();
        let copy = store.clone();
        prop_assert_eq!(flatten(&store), flatten(&copy));
    }

    #[test]
    fn prop_double_toggle_is_identity(parents in forest_strategy(), pick in any::<prop::sample::Index>()) {
        let forest = Forest::new(&parents);
        let mut store = forest.fully_expanded();
        let target = name(pick.index(parents.len()));
        let before = flatten(&store);

        store.toggle_expand(&target).unwrap();
        store.toggle_expand(&target).unwrap();
        prop_assert_eq!(flatten(&store), before);
    }

    #[test]
    fn prop_remove_drops_whole_subtree(parents in forest_strategy(), pick in any::<prop::sample::Index>()) {
        let forest = Forest::new(&parents);
        let mut store = forest.fully_expanded();
        let target = pick.index(parents.len());

        let removed = store.remove_node(&name(target)).unwrap();
        prop_assert_eq!(removed, forest.subtree_size(target));
        prop_assert_eq!(store.len(), parents.len() - removed);
        prop_assert!(!store.contains(&name(target)));
        prop_assert!(store.check_invariants().is_empty());
    }

    #[test]
    fn prop_random_actions_keep_store_consistent(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut store: TreeStore<usize> = TreeStore::new();
        load_page(&mut store, 0);
        let mut pending: Vec<(NodeId, RequestToken)> = Vec::new();
        let mut next_child = 0usize;

        for op in ops {
            let ids: Vec<NodeId> = store.nodes().map(|node| node.id().clone()).collect();
            match op {
                Op::Toggle(i) if !ids.is_empty() => {
                    let target = ids[i % ids.len()].clone();
                    if let ToggleOutcome::FetchRequired { token } = store.toggle_expand(&target).unwrap() {
                        prop_assert!(
                            !pending.iter().any(|(id, _)| *id == target),
                            "second fetch issued for {}", target
                        );
                        pending.push((target, token));
                    }
                }
                Op::Resolve { slot, children, fail } if !pending.is_empty() => {
                    let (target, token) = pending.remove(slot % pending.len());
                    if fail {
                        store.apply_children_failed(&target, token, "injected");
                    } else {
                        let records = (0..children)
                            .map(|_| {
                                next_child += 1;
                                NodeRecord::new(format!("c{}", next_child), next_child, next_child % 2 == 0)
                            })
                            .collect();
                        store.apply_children_fetched(&target, token, records);
                    }
                }
                Op::Insert(i) if !ids.is_empty() => {
                    next_child += 1;
                    let parent = &ids[i % ids.len()];
                    store
                        .insert_local_child(parent, NodeRecord::new(format!("c{}", next_child), next_child, false))
                        .unwrap();
                }
                Op::Remove(i) if !ids.is_empty() => {
                    store.remove_node(&ids[i % ids.len()]).unwrap();
                }
                Op::CollapseAll => store.collapse_all(),
                Op::LoadPage(page) => load_page(&mut store, page),
                _ => {}
            }

            // Entries whose node left the arena can never apply again
            pending.retain(|(id, _)| store.contains(id));

            let violations = store.check_invariants();
            prop_assert!(violations.is_empty(), "violations: {:?}", violations);
            for row in flatten(&store) {
                prop_assert_eq!(store.depth(&row.node_id), Some(row.depth));
            }
        }
    }
}
