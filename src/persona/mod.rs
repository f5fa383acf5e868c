//! Celestial personas and where to find their faces.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Persona {
    pub name: String,
    /// UI override; `label()` falls back to `name` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub avatar_url: String,
}

impl Persona {
    pub fn new(name: impl Into<String>, avatar_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            avatar_url: avatar_url.into(),
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// What the transport shows for this persona. History keeps the
    /// canonical `name`.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

/// The solar system roster. Read-only once a session starts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersonaRegistry {
    personas: Vec<Persona>,
}

impl PersonaRegistry {
    pub fn new(personas: Vec<Persona>) -> Self {
        Self { personas }
    }

    /// The ten celestial bodies with their portrait images.
    pub fn builtin() -> Self {
        Self::new(vec![
            Persona::new(
                "Sun",
                "https://upload.wikimedia.org/wikipedia/commons/e/e1/Sun_poster.svg",
            ),
            Persona::new(
                "Moon",
                "https://upload.wikimedia.org/wikipedia/commons/6/68/FullMoon2010.jpg",
            ),
            Persona::new(
                "Mercury",
                "https://upload.wikimedia.org/wikipedia/commons/d/d9/Mercury_in_color_-_Prockter07_centered.jpg",
            ),
            Persona::new(
                "Venus",
                "https://upload.wikimedia.org/wikipedia/commons/e/ef/Venus-real_color.jpg",
            ),
            Persona::new(
                "Mars",
                "https://upload.wikimedia.org/wikipedia/commons/4/4e/Mars_Valles_Marineris.jpeg",
            ),
            Persona::new(
                "Jupiter",
                "https://upload.wikimedia.org/wikipedia/commons/5/5a/Jupiter_and_its_shrunken_Great_Red_Spot.jpg",
            ),
            Persona::new(
                "Saturn",
                "https://upload.wikimedia.org/wikipedia/commons/c/c7/Saturn_during_Equinox.jpg",
            ),
            Persona::new(
                "Uranus",
                "https://upload.wikimedia.org/wikipedia/commons/3/3d/Uranus2.jpg",
            ),
            Persona::new(
                "Neptune",
                "https://upload.wikimedia.org/wikipedia/commons/5/56/Neptune_Full.jpg",
            ),
            Persona::new(
                "Pluto",
                "https://upload.wikimedia.org/wikipedia/commons/e/ef/Pluto_by_LORRI_and_Ralph%2C_13_July_2015.jpg",
            ),
        ])
    }

    pub fn get(&self, name: &str) -> Option<&Persona> {
        self.personas
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn all(&self) -> &[Persona] {
        &self.personas
    }

    /// Resolve a list of names to personas; unknown names are dropped with a
    /// warning rather than failing the session.
    pub fn subset(&self, names: &[String]) -> Vec<Persona> {
        let mut picked = Vec::new();
        for name in names {
            match self.get(name) {
                Some(persona) => picked.push(persona.clone()),
                None => warn!(persona = %name, "unknown persona requested; skipping"),
            }
        }
        picked
    }

    pub fn len(&self) -> usize {
        self.personas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }
}

impl Default for PersonaRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// JSON-file persistence for a persona roster.
pub struct PersonaStore {
    path: PathBuf,
}

impl PersonaStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the roster, seeding the file with the builtin planets when it
    /// does not exist yet.
    pub async fn load(&self) -> Result<PersonaRegistry> {
        if !self.path.exists() {
            let registry = PersonaRegistry::builtin();
            self.save(&registry).await?;
            return Ok(registry);
        }
        let content = fs::read_to_string(&self.path).await?;
        let personas: Vec<Persona> = serde_json::from_str(&content)?;
        Ok(PersonaRegistry::new(personas))
    }

    pub async fn save(&self, registry: &PersonaRegistry) -> Result<()> {
        let content = serde_json::to_string_pretty(registry.all())?;
        fs::write(&self.path, content).await?;
        Ok(())
    }
}
