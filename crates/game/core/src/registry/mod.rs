//! Load-time registries.
//!
//! [`Registries`] owns every immutable definition the core looks up by id:
//! effect templates, graph programs, preset handler rows, builtin handlers,
//! and the attribute/tag name tables. It is built once before the first
//! tick and only read afterwards. [`Registries::clear`] restores the
//! freshly-constructed state so tests can reuse one value.
mod error;
mod names;

use std::collections::BTreeMap;

pub use error::RegistryError;
pub use names::NameTable;

use crate::effect::EffectTemplate;
use crate::graph::{GraphInstruction, Program};
use crate::phase::{BuiltinRegistry, PresetRegistry};
use crate::state::{AttributeId, ProgramId, TagId, TemplateId};

/// Names reserved for the well-known attribute ids.
const RESERVED_ATTRIBUTES: [&str; 2] = ["force_request_x", "force_request_y"];

#[derive(Debug)]
pub struct Registries {
    templates: BTreeMap<TemplateId, EffectTemplate>,
    programs: BTreeMap<ProgramId, Program>,
    presets: PresetRegistry,
    builtins: BuiltinRegistry,
    attributes: NameTable<AttributeId>,
    tags: NameTable<TagId>,
    cooldown_attributes: Vec<AttributeId>,
}

impl Default for Registries {
    fn default() -> Self {
        Self::new()
    }
}

impl Registries {
    /// Empty registries with the standard presets and builtins installed.
    pub fn new() -> Self {
        let mut attributes = NameTable::new();
        for name in RESERVED_ATTRIBUTES {
            // A fresh table cannot be full.
            let _ = attributes.intern(name);
        }
        Self {
            templates: BTreeMap::new(),
            programs: BTreeMap::new(),
            presets: PresetRegistry::standard(),
            builtins: BuiltinRegistry::standard(),
            attributes,
            tags: NameTable::new(),
            cooldown_attributes: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }

    // ===== programs =====

    pub fn register_program(&mut self, id: ProgramId, program: Program) -> Result<(), RegistryError> {
        if self.programs.contains_key(&id) {
            return Err(RegistryError::DuplicateProgram(id));
        }
        self.programs.insert(id, program);
        Ok(())
    }

    /// Validates `instructions` and registers the resulting program.
    pub fn register_instructions(
        &mut self,
        id: ProgramId,
        instructions: Vec<GraphInstruction>,
    ) -> Result<(), RegistryError> {
        let program = Program::new(instructions)?;
        self.register_program(id, program)
    }

    pub fn program(&self, id: ProgramId) -> Option<&Program> {
        self.programs.get(&id)
    }

    // ===== templates =====

    /// Registers `template` after checking it against what is already loaded.
    ///
    /// Programs and presets a template references must be registered first.
    pub fn register_template(&mut self, template: EffectTemplate) -> Result<(), RegistryError> {
        let id = template.id;
        if self.templates.contains_key(&id) {
            return Err(RegistryError::DuplicateTemplate(id));
        }
        let dropped = template.dropped + template.config.dropped();
        if dropped > 0 {
            return Err(RegistryError::CapacityExceeded {
                template: id,
                dropped,
            });
        }
        if let Some(program) = template
            .bindings
            .programs()
            .chain(template.gate)
            .find(|program| !self.programs.contains_key(program))
        {
            return Err(RegistryError::UnknownProgram {
                template: id,
                program,
            });
        }
        if let Some(preset) = template.preset.filter(|preset| !self.presets.contains(*preset)) {
            return Err(RegistryError::UnknownPreset {
                template: id,
                preset,
            });
        }

        if let Some(cooldown) = template.cooldown {
            if let Err(slot) = self.cooldown_attributes.binary_search(&cooldown.attribute) {
                self.cooldown_attributes.insert(slot, cooldown.attribute);
            }
        }
        tracing::debug!(
            target: "core::registry",
            template = %id,
            lifetime = ?template.lifetime,
            "registered effect template"
        );
        self.templates.insert(id, template);
        Ok(())
    }

    pub fn template(&self, id: TemplateId) -> Option<&EffectTemplate> {
        self.templates.get(&id)
    }

    /// Templates in id order.
    pub fn templates(&self) -> impl Iterator<Item = &EffectTemplate> {
        self.templates.values()
    }

    /// Attributes used as cooldown counters by any registered template,
    /// sorted and deduplicated.
    pub fn cooldown_attributes(&self) -> &[AttributeId] {
        &self.cooldown_attributes
    }

    // ===== handlers and names =====

    pub fn presets(&self) -> &PresetRegistry {
        &self.presets
    }

    pub fn presets_mut(&mut self) -> &mut PresetRegistry {
        &mut self.presets
    }

    pub fn builtins(&self) -> &BuiltinRegistry {
        &self.builtins
    }

    pub fn builtins_mut(&mut self) -> &mut BuiltinRegistry {
        &mut self.builtins
    }

    pub fn attributes(&self) -> &NameTable<AttributeId> {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut NameTable<AttributeId> {
        &mut self.attributes
    }

    pub fn tags(&self) -> &NameTable<TagId> {
        &self.tags
    }

    pub fn tags_mut(&mut self) -> &mut NameTable<TagId> {
        &mut self.tags
    }
}
