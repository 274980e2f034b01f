use std::collections::{BTreeMap, HashMap, VecDeque};

use rbxl_types::Ref;

use crate::instance::{Instance, InstanceBuilder};

/// An instance forest: an ordered list of root instances, each with its own
/// descendants, plus a map of document-level metadata.
///
/// Place files conventionally hold one root per top-level service; model
/// files hold one root per modeled object.
#[derive(Debug, Default)]
pub struct Dom {
    instances: HashMap<Ref, Instance>,
    root_refs: Vec<Ref>,
    metadata: BTreeMap<String, String>,
}

impl Dom {
    /// Construct an empty `Dom` with no roots and no metadata.
    pub fn new() -> Self {
        Dom {
            instances: HashMap::new(),
            root_refs: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// The referents of the forest's roots, in order.
    pub fn root_refs(&self) -> &[Ref] {
        &self.root_refs
    }

    /// Document-level metadata, like `ExplicitAutoJoints`. Keys iterate in
    /// sorted order.
    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.metadata
    }

    /// The total number of instances in the forest.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn get_by_ref(&self, referent: Ref) -> Option<&Instance> {
        self.instances.get(&referent)
    }

    pub fn get_by_ref_mut(&mut self, referent: Ref) -> Option<&mut Instance> {
        self.instances.get_mut(&referent)
    }

    /// Insert the tree described by `root_builder` into this `Dom`. If
    /// `parent_ref` is null the new instance becomes a root; otherwise it is
    /// appended to that parent's children.
    ///
    /// Returns the referent of the newly created top instance.
    ///
    /// ## Panics
    /// Panics if `parent_ref` is non-null and does not refer to an instance
    /// in this `Dom`.
    pub fn insert(&mut self, parent_ref: Ref, root_builder: InstanceBuilder) -> Ref {
        let root_referent = root_builder.referent;

        let mut to_insert = VecDeque::new();
        to_insert.push_back((parent_ref, root_builder));

        while let Some((parent, builder)) = to_insert.pop_front() {
            let InstanceBuilder {
                referent,
                name,
                class,
                is_service,
                properties,
                children,
            } = builder;

            self.instances.insert(
                referent,
                Instance {
                    referent,
                    children: Vec::new(),
                    parent,
                    name,
                    class,
                    is_service,
                    properties,
                },
            );

            if parent.is_none() {
                self.root_refs.push(referent);
            } else {
                self.instances
                    .get_mut(&parent)
                    .expect("Cannot insert into an instance that is not in this Dom")
                    .children
                    .push(referent);
            }

            for child in children {
                to_insert.push_back((referent, child));
            }
        }

        root_referent
    }

    /// The referents of `referent` and all of its descendants, in
    /// depth-first order.
    pub fn descendants_of(&self, referent: Ref) -> Vec<Ref> {
        let mut output = Vec::new();
        let mut to_visit = vec![referent];

        while let Some(current) = to_visit.pop() {
            if let Some(instance) = self.instances.get(&current) {
                output.push(current);
                to_visit.extend(instance.children.iter().rev().copied());
            }
        }

        output
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn insert_roots_in_order() {
        let mut dom = Dom::new();

        let first = dom.insert(Ref::none(), InstanceBuilder::new("Workspace"));
        let second = dom.insert(Ref::none(), InstanceBuilder::new("Lighting"));

        assert_eq!(dom.root_refs(), &[first, second]);
        assert_eq!(dom.len(), 2);
    }

    #[test]
    fn insert_nested_builder() {
        let mut dom = Dom::new();

        let root = dom.insert(
            Ref::none(),
            InstanceBuilder::new("Folder")
                .with_child(InstanceBuilder::new("Part").with_name("First"))
                .with_child(InstanceBuilder::new("Part").with_name("Second")),
        );

        let folder = dom.get_by_ref(root).unwrap();
        assert_eq!(folder.children().len(), 2);

        let first = dom.get_by_ref(folder.children()[0]).unwrap();
        let second = dom.get_by_ref(folder.children()[1]).unwrap();
        assert_eq!(first.name, "First");
        assert_eq!(second.name, "Second");
        assert_eq!(first.parent(), root);
    }

    #[test]
    fn descendants_are_depth_first() {
        let mut dom = Dom::new();

        let root = dom.insert(
            Ref::none(),
            InstanceBuilder::new("Folder").with_child(
                InstanceBuilder::new("Model").with_child(InstanceBuilder::new("Part")),
            ),
        );

        let descendants = dom.descendants_of(root);
        let classes: Vec<&str> = descendants
            .iter()
            .map(|id| dom.get_by_ref(*id).unwrap().class.as_str())
            .collect();

        assert_eq!(classes, &["Folder", "Model", "Part"]);
    }

    #[test]
    fn metadata_round_trips_through_accessors() {
        let mut dom = Dom::new();
        dom.metadata_mut()
            .insert("ExplicitAutoJoints".to_owned(), "true".to_owned());

        assert_eq!(
            dom.metadata().get("ExplicitAutoJoints").map(String::as_str),
            Some("true")
        );
    }
}
