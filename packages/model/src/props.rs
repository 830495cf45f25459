use crate::{IdGenerator, InstanceId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
    Bool(bool),
    Number(f64),
    String(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prop {
    pub id: String,
    pub prop: String,
    pub value: PropValue,
}

/// Authored props of one instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProps {
    pub id: String,
    pub instance_id: InstanceId,
    pub tree_id: String,
    pub props: Vec<Prop>,
}

impl UserProps {
    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.props.iter().find(|p| p.prop == name).map(|p| &p.value)
    }
}

/// The `props` container: one record per instance with authored props
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropsStore(pub BTreeMap<InstanceId, UserProps>);

impl PropsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, instance_id: &str) -> Option<&UserProps> {
        self.0.get(instance_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Set one prop, creating the record on first write
    pub fn set_prop(
        &mut self,
        ids: &mut IdGenerator,
        tree_id: &str,
        instance_id: &str,
        name: &str,
        value: PropValue,
    ) {
        let record = self
            .0
            .entry(instance_id.to_string())
            .or_insert_with(|| UserProps {
                id: ids.new_id(),
                instance_id: instance_id.to_string(),
                tree_id: tree_id.to_string(),
                props: Vec::new(),
            });

        match record.props.iter_mut().find(|p| p.prop == name) {
            Some(prop) => prop.value = value,
            None => record.props.push(Prop {
                id: ids.new_id(),
                prop: name.to_string(),
                value,
            }),
        }
    }

    /// Remove a prop; drops the record once it holds nothing.
    /// Returns false when there was nothing to remove.
    pub fn remove_prop(&mut self, instance_id: &str, name: &str) -> bool {
        let Some(record) = self.0.get_mut(instance_id) else {
            return false;
        };
        let before = record.props.len();
        record.props.retain(|p| p.prop != name);
        let removed = record.props.len() != before;
        if record.props.is_empty() {
            self.0.remove(instance_id);
        }
        removed
    }

    /// Drop the records of every listed instance
    pub fn remove_instances<'a>(&mut self, instance_ids: impl IntoIterator<Item = &'a InstanceId>) {
        for id in instance_ids {
            self.0.remove(id);
        }
    }

    /// Copy records from `source` ids onto cloned ids, minting new record ids
    pub fn duplicate<'a>(
        &mut self,
        ids: &mut IdGenerator,
        mapping: impl IntoIterator<Item = (&'a InstanceId, &'a InstanceId)>,
    ) {
        for (from, to) in mapping {
            let Some(source) = self.0.get(from) else {
                continue;
            };
            let mut copy = source.clone();
            copy.id = ids.new_id();
            copy.instance_id = to.clone();
            for prop in &mut copy.props {
                prop.id = ids.new_id();
            }
            self.0.insert(to.clone(), copy);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_remove_prop() {
        let mut ids = IdGenerator::from_seed("p");
        let mut store = PropsStore::new();

        store.set_prop(&mut ids, "tree", "a", "href", PropValue::String("/".into()));
        store.set_prop(&mut ids, "tree", "a", "href", PropValue::String("/about".into()));
        store.set_prop(&mut ids, "tree", "a", "disabled", PropValue::Bool(true));

        let record = store.get("a").unwrap();
        assert_eq!(record.props.len(), 2);
        assert_eq!(record.get("href"), Some(&PropValue::String("/about".into())));

        assert!(store.remove_prop("a", "href"));
        assert!(store.remove_prop("a", "disabled"));
        assert!(store.get("a").is_none());
        assert!(!store.remove_prop("a", "disabled"));
    }

    #[test]
    fn test_duplicate_mints_new_ids() {
        let mut ids = IdGenerator::from_seed("p");
        let mut store = PropsStore::new();
        store.set_prop(&mut ids, "tree", "a", "alt", PropValue::String("logo".into()));

        let (from, to) = ("a".to_string(), "b".to_string());
        store.duplicate(&mut ids, [(&from, &to)]);

        let (a, b) = (store.get("a").unwrap(), store.get("b").unwrap());
        assert_eq!(b.instance_id, "b");
        assert_ne!(a.id, b.id);
        assert_ne!(a.props[0].id, b.props[0].id);
        assert_eq!(a.props[0].value, b.props[0].value);
    }

    #[test]
    fn test_prop_value_wire_shape() {
        let values: Vec<PropValue> = serde_json::from_str(r#"[true, 2.5, "x"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                PropValue::Bool(true),
                PropValue::Number(2.5),
                PropValue::String("x".into())
            ]
        );
    }
}
