//! Assigns materials to the parts of a loaded model by role.
//!
//! A [`MaterialRoles`] table lists roles in priority order, each with the
//! matchers that select its parts. The first matching role wins. Parts no
//! role matches go to the fallback role, or keep the material the file gave
//! them when there is none.

use serde::Deserialize;

use crate::{data_structures::material::Material, resources::gltf::LoadedModel};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClassifyError {
    #[error("no part matches the required role `{role}`")]
    MissingRequired { role: String },
    #[error("no material given for role `{role}`")]
    MissingMaterial { role: String },
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub enum PartMatcher {
    /// Whole part name, case-sensitive.
    Exact(String),
    /// Substring of the part name, case-insensitive.
    Contains(String),
    /// Position in the model's depth-first part order.
    Index(usize),
}

impl PartMatcher {
    pub fn matches(&self, index: usize, name: &str) -> bool {
        match self {
            PartMatcher::Exact(exact) => name == exact,
            PartMatcher::Contains(needle) => name.to_lowercase().contains(&needle.to_lowercase()),
            PartMatcher::Index(i) => *i == index,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Role {
    pub name: String,
    pub matchers: Vec<PartMatcher>,
    pub required: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MaterialRoles {
    roles: Vec<Role>,
    fallback: Option<usize>,
}

impl MaterialRoles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn role(mut self, name: &str, matchers: Vec<PartMatcher>, required: bool) -> Self {
        self.roles.push(Role {
            name: name.to_string(),
            matchers,
            required,
        });
        self
    }

    /// Sends unmatched parts to the role `name`, adding it if needed.
    pub fn fallback_to(mut self, name: &str) -> Self {
        let index = match self.roles.iter().position(|r| r.name == name) {
            Some(index) => index,
            None => {
                self.roles.push(Role {
                    name: name.to_string(),
                    matchers: Vec::new(),
                    required: false,
                });
                self.roles.len() - 1
            }
        };
        self.fallback = Some(index);
        self
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    /// Role index per part name, `None` for pass-through parts.
    pub fn classify(&self, names: &[&str]) -> Result<Vec<Option<usize>>, ClassifyError> {
        let mut matched = vec![false; self.roles.len()];
        let assignment = names
            .iter()
            .enumerate()
            .map(|(index, name)| {
                let hit = self
                    .roles
                    .iter()
                    .position(|role| role.matchers.iter().any(|m| m.matches(index, name)));
                if let Some(role) = hit {
                    matched[role] = true;
                }
                hit.or(self.fallback)
            })
            .collect();
        if let Some(role) = self
            .roles
            .iter()
            .zip(&matched)
            .find(|(role, hit)| role.required && !**hit)
            .map(|(role, _)| role)
        {
            return Err(ClassifyError::MissingRequired {
                role: role.name.clone(),
            });
        }
        Ok(assignment)
    }

    /// Classifies the parts of `model` and gives every role its material.
    /// `materials` is looked up by role name; the materials join the group
    /// `{group_prefix}.{role}`.
    pub fn apply(
        &self,
        model: &mut LoadedModel,
        group_prefix: &str,
        materials: Vec<(&str, Material)>,
    ) -> Result<(), ClassifyError> {
        let names: Vec<String> = model.parts().iter().map(|p| p.name.clone()).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let assignment = self.classify(&names)?;

        let mut by_role = vec![None; self.roles.len()];
        let mut materials = materials;
        for (index, role) in self.roles.iter().enumerate() {
            if !assignment.contains(&Some(index)) {
                continue;
            }
            let position = materials
                .iter()
                .position(|(name, _)| *name == role.name)
                .ok_or_else(|| ClassifyError::MissingMaterial {
                    role: role.name.clone(),
                })?;
            let (_, material) = materials.swap_remove(position);
            let group = format!("{group_prefix}.{}", role.name);
            by_role[index] = Some(model.add_material(material, Some(&group)));
        }

        model.for_each_part_mut(&mut |index, part| {
            if let Some(material) = assignment[index].and_then(|role| by_role[role]) {
                part.material = Some(material);
            }
        });
        Ok(())
    }
}
