// An Owner is the parent object a child resource is reconciled on behalf of.
// Children point back at it through a controller owner reference, and that
// reference is what decides whether the accessor may touch an existing child.

use crate::Error;
use k8s_openapi::api::core::v1::ObjectReference;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::Resource;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Owner {
    pub api_version: String,
    pub kind: String,
    pub namespace: Option<String>,
    pub name: String,
    pub uid: String,
}

impl Owner {
    pub fn from_resource<O>(obj: &O) -> Result<Self, Error>
    where
        O: Resource<DynamicType = ()>,
    {
        let meta = obj.meta();
        Ok(Self {
            api_version: O::api_version(&()).into_owned(),
            kind: O::kind(&()).into_owned(),
            namespace: meta.namespace.clone(),
            name: meta.name.clone().ok_or(Error::MissingObjectKey("name"))?,
            uid: meta.uid.clone().ok_or(Error::MissingObjectKey("uid"))?,
        })
    }

    /// Reference used as the subject of events about this owner.
    pub fn object_ref(&self) -> ObjectReference {
        ObjectReference {
            api_version: Some(self.api_version.clone()),
            kind: Some(self.kind.clone()),
            namespace: self.namespace.clone(),
            name: Some(self.name.clone()),
            uid: Some(self.uid.clone()),
            ..ObjectReference::default()
        }
    }

    /// Owner reference marking this owner as the controller of a child.
    pub fn controller_ref(&self) -> OwnerReference {
        OwnerReference {
            api_version: self.api_version.clone(),
            kind: self.kind.clone(),
            name: self.name.clone(),
            uid: self.uid.clone(),
            controller: Some(true),
            block_owner_deletion: Some(true),
        }
    }

    /// True iff the child's controller reference names this owner by kind, name and uid.
    pub fn controls<K: Resource>(&self, child: &K) -> bool {
        matches!(
            controller_of(child),
            Some(r) if r.kind == self.kind && r.name == self.name && r.uid == self.uid
        )
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{} {}/{}", self.kind, ns, self.name),
            None => write!(f, "{} {}", self.kind, self.name),
        }
    }
}

/// The first owner reference flagged as controller, if any.
pub fn controller_of<K: Resource>(child: &K) -> Option<&OwnerReference> {
    child
        .meta()
        .owner_references
        .iter()
        .flatten()
        .find(|r| r.controller == Some(true))
}
