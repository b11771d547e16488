//! Typed universe of objects: the domain constants and the problem objects, organized by a type hierarchy.

use hashbrown::{HashMap, HashSet};
use thiserror::Error;

use crate::model::Description;

/// Universal supertype: every object is of type `object`.
pub const TOP_TYPE: &str = "object";

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("unknown type `{0}`")]
    UnknownType(String),
    #[error("object `{name}` is declared with both type `{first}` and type `{second}`")]
    ConflictingObject { name: String, first: String, second: String },
    #[error("declaring `{parent}` as parent of `{tpe}` creates a cycle in the type hierarchy")]
    CyclicType { tpe: String, parent: String },
}

#[derive(Clone, Debug)]
pub struct ObjectCatalog {
    /// Parent of each declared type. Types without explicit parent are below `object`.
    parents: HashMap<String, Option<String>>,
    /// Objects with their types, in declaration order.
    objects: Vec<(String, String)>,
    types_of: HashMap<String, String>,
    /// If true, unknown types are silently accepted.
    lenient: bool,
}

impl ObjectCatalog {
    pub fn new(lenient: bool) -> Self {
        ObjectCatalog {
            parents: HashMap::new(),
            objects: Vec::new(),
            types_of: HashMap::new(),
            lenient,
        }
    }

    /// Builds the catalog of a task: types first, then domain constants and finally problem objects.
    pub fn of(description: &Description, lenient: bool) -> Result<Self, CatalogError> {
        let mut catalog = ObjectCatalog::new(lenient);
        for tpe in &description.types {
            catalog.add_type(tpe.name.canonical_str(), tpe.parent.as_ref().map(|p| p.canonical_str()))?;
        }
        for o in description.constants.iter().chain(description.objects.iter()) {
            catalog.add_object(o.name.canonical_str(), o.tpe.canonical_str())?;
        }
        Ok(catalog)
    }

    /// Records a type with an optional parent. A parent that is not declared yet is created below `object`.
    pub fn add_type(&mut self, tpe: &str, parent: Option<&str>) -> Result<(), CatalogError> {
        if tpe == TOP_TYPE {
            return match parent {
                None | Some(TOP_TYPE) => Ok(()),
                Some(parent) => Err(CatalogError::CyclicType {
                    tpe: tpe.to_string(),
                    parent: parent.to_string(),
                }),
            };
        }
        let parent = parent.filter(|&p| p != TOP_TYPE);
        if let Some(parent) = parent {
            if self.is_subtype(parent, tpe) {
                return Err(CatalogError::CyclicType {
                    tpe: tpe.to_string(),
                    parent: parent.to_string(),
                });
            }
            self.parents.entry(parent.to_string()).or_insert(None);
        }
        let entry = self.parents.entry(tpe.to_string()).or_insert(None);
        if parent.is_some() {
            *entry = parent.map(|p| p.to_string());
        }
        Ok(())
    }

    pub fn contains_type(&self, tpe: &str) -> bool {
        tpe == TOP_TYPE || self.parents.contains_key(tpe)
    }

    /// Records an object. Redeclaring an object with the same type is accepted, as some domains do it.
    pub fn add_object(&mut self, name: &str, tpe: &str) -> Result<(), CatalogError> {
        if !self.contains_type(tpe) {
            if self.lenient {
                self.add_type(tpe, None)?;
            } else {
                return Err(CatalogError::UnknownType(tpe.to_string()));
            }
        }
        match self.types_of.get(name) {
            Some(previous) if previous == tpe => Ok(()),
            Some(previous) => Err(CatalogError::ConflictingObject {
                name: name.to_string(),
                first: previous.clone(),
                second: tpe.to_string(),
            }),
            None => {
                self.types_of.insert(name.to_string(), tpe.to_string());
                self.objects.push((name.to_string(), tpe.to_string()));
                Ok(())
            }
        }
    }

    /// Returns true if `tpe` is `supertype` or one of its (transitive) subtypes.
    pub fn is_subtype(&self, tpe: &str, supertype: &str) -> bool {
        if supertype == TOP_TYPE || tpe == supertype {
            return true;
        }
        let mut visited = HashSet::new();
        let mut current = tpe;
        while let Some(Some(parent)) = self.parents.get(current) {
            if parent == supertype {
                return true;
            }
            if !visited.insert(parent.as_str()) {
                break;
            }
            current = parent;
        }
        false
    }

    /// All objects of the given type (including objects of its subtypes), in declaration order.
    /// The type `object` denotes every object.
    pub fn objects_of_type(&self, tpe: &str) -> Result<Vec<&str>, CatalogError> {
        if !self.contains_type(tpe) {
            if self.lenient {
                tracing::warn!("no object of undeclared type `{tpe}`");
                return Ok(Vec::new());
            }
            return Err(CatalogError::UnknownType(tpe.to_string()));
        }
        Ok(self
            .objects
            .iter()
            .filter(|(_, t)| self.is_subtype(t, tpe))
            .map(|(name, _)| name.as_str())
            .collect())
    }

    pub fn num_objects(&self) -> usize {
        self.objects.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logistics() -> Result<ObjectCatalog, CatalogError> {
        let mut catalog = ObjectCatalog::new(false);
        catalog.add_type("vehicle", None)?;
        catalog.add_type("truck", Some("vehicle"))?;
        catalog.add_type("plane", Some("vehicle"))?;
        catalog.add_type("location", Some("object"))?;
        catalog.add_object("depot", "location")?;
        catalog.add_object("t1", "truck")?;
        catalog.add_object("p1", "plane")?;
        catalog.add_object("t2", "truck")?;
        Ok(catalog)
    }

    #[test]
    fn objects_by_type() -> Result<(), CatalogError> {
        let catalog = logistics()?;
        assert_eq!(catalog.objects_of_type("truck")?, vec!["t1", "t2"]);
        assert_eq!(catalog.objects_of_type("vehicle")?, vec!["t1", "p1", "t2"]);
        assert_eq!(catalog.objects_of_type("object")?, vec!["depot", "t1", "p1", "t2"]);
        assert!(catalog.objects_of_type("boat").is_err());
        assert!(catalog.is_subtype("truck", "vehicle"));
        assert!(!catalog.is_subtype("vehicle", "truck"));
        assert_eq!(catalog.objects_of_type("plane")?, vec!["p1"]);
        Ok(())
    }

    #[test]
    fn duplicate_objects() -> Result<(), CatalogError> {
        let mut catalog = logistics()?;
        catalog.add_object("t1", "truck")?;
        assert_eq!(catalog.num_objects(), 4);
        assert!(matches!(
            catalog.add_object("t1", "plane"),
            Err(CatalogError::ConflictingObject { .. })
        ));
        Ok(())
    }

    #[test]
    fn rejects_cycles() -> Result<(), CatalogError> {
        let mut catalog = logistics()?;
        assert!(matches!(
            catalog.add_type("vehicle", Some("truck")),
            Err(CatalogError::CyclicType { .. })
        ));
        assert!(catalog.add_type("object", Some("vehicle")).is_err());
        Ok(())
    }

    #[test]
    fn lenient_catalog_accepts_unknown_types() -> Result<(), CatalogError> {
        let mut catalog = ObjectCatalog::new(true);
        catalog.add_object("a", "block")?;
        assert_eq!(catalog.objects_of_type("block")?, vec!["a"]);
        assert!(catalog.objects_of_type("ghost")?.is_empty());
        Ok(())
    }
}
