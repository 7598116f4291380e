//! Named, reusable site lists.
//!
//! Profiles are independent of the blocking session: starting a session from
//! a profile copies its site list, so later edits never reach a running
//! session.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{keys, KeyValueStore, KeyValueStoreExt};
use crate::domain::{normalize_all, Domain};
use crate::error::{Result, ValidationError};

/// Opaque profile identifier.
pub type ProfileId = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub name: String,
    pub sites: Vec<Domain>,
}

/// CRUD access to the `profiles` key.
#[derive(Clone)]
pub struct ProfileStore {
    store: Arc<dyn KeyValueStore>,
}

impl ProfileStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn list(&self) -> Result<Vec<Profile>> {
        Ok(self.store.read(keys::PROFILES)?.unwrap_or_default())
    }

    pub fn get(&self, id: &str) -> Result<Option<Profile>> {
        Ok(self.list()?.into_iter().find(|p| p.id == id))
    }

    /// Create a profile. Sites are normalized; entries that normalize to
    /// nothing are dropped.
    pub fn create<S: AsRef<str>>(&self, name: &str, sites: &[S]) -> Result<Profile> {
        let (name, sites) = validate(name, sites)?;
        let profile = Profile {
            id: format!("profile_{}", uuid::Uuid::new_v4().simple()),
            name,
            sites,
        };

        let mut profiles = self.list()?;
        profiles.push(profile.clone());
        self.store.write(keys::PROFILES, &profiles)?;
        Ok(profile)
    }

    pub fn update<S: AsRef<str>>(&self, id: &str, name: &str, sites: &[S]) -> Result<Profile> {
        let (name, sites) = validate(name, sites)?;
        let mut profiles = self.list()?;
        let profile = profiles
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| ValidationError::ProfileNotFound(id.to_string()))?;
        profile.name = name;
        profile.sites = sites;
        let updated = profile.clone();

        self.store.write(keys::PROFILES, &profiles)?;
        Ok(updated)
    }

    /// Delete a profile. Returns false if it did not exist.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let mut profiles = self.list()?;
        let before = profiles.len();
        profiles.retain(|p| p.id != id);
        if profiles.len() == before {
            return Ok(false);
        }
        self.store.write(keys::PROFILES, &profiles)?;
        Ok(true)
    }
}

fn validate<S: AsRef<str>>(name: &str, sites: &[S]) -> Result<(String, Vec<Domain>)> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::InvalidValue {
            field: "name".into(),
            message: "profile name is empty".into(),
        }
        .into());
    }
    let sites = normalize_all(sites);
    if sites.is_empty() {
        return Err(ValidationError::EmptySiteList.into());
    }
    Ok((name.to_string(), sites))
}
