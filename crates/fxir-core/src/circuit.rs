use crate::stmt::Statement;
use crate::types::Type;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Input,
    Output,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Port {
    pub name: String,
    pub direction: Direction,
    pub ty: Type,
}

impl Port {
    pub fn new(name: impl Into<String>, direction: Direction, ty: Type) -> Self {
        Self {
            name: name.into(),
            direction,
            ty,
        }
    }

    pub fn try_map_type<E, F>(self, f: F) -> Result<Port, E>
    where
        F: FnOnce(Type) -> Result<Type, E>,
    {
        Ok(Port {
            name: self.name,
            direction: self.direction,
            ty: f(self.ty)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub ports: Vec<Port>,
    pub body: Statement,
}

/// A module implemented outside the circuit; only its interface is known.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExtModule {
    pub name: String,
    pub ports: Vec<Port>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DefModule {
    Module(Module),
    ExtModule(ExtModule),
}

impl DefModule {
    pub fn name(&self) -> &str {
        match self {
            DefModule::Module(m) => &m.name,
            DefModule::ExtModule(m) => &m.name,
        }
    }

    pub fn ports(&self) -> &[Port] {
        match self {
            DefModule::Module(m) => &m.ports,
            DefModule::ExtModule(m) => &m.ports,
        }
    }

    pub fn body(&self) -> Option<&Statement> {
        match self {
            DefModule::Module(m) => Some(&m.body),
            DefModule::ExtModule(_) => None,
        }
    }

    pub fn try_map_ports<E, F>(self, mut f: F) -> Result<DefModule, E>
    where
        F: FnMut(Port) -> Result<Port, E>,
    {
        let map_all = |ports: Vec<Port>, f: &mut F| {
            ports
                .into_iter()
                .map(|p| f(p))
                .collect::<Result<Vec<_>, E>>()
        };
        Ok(match self {
            DefModule::Module(m) => DefModule::Module(Module {
                ports: map_all(m.ports, &mut f)?,
                name: m.name,
                body: m.body,
            }),
            DefModule::ExtModule(m) => DefModule::ExtModule(ExtModule {
                ports: map_all(m.ports, &mut f)?,
                name: m.name,
            }),
        })
    }

    /// Rewrites the body of a module; external modules have none and pass through.
    pub fn try_map_body<E, F>(self, f: F) -> Result<DefModule, E>
    where
        F: FnOnce(Statement) -> Result<Statement, E>,
    {
        Ok(match self {
            DefModule::Module(m) => DefModule::Module(Module {
                name: m.name,
                ports: m.ports,
                body: f(m.body)?,
            }),
            ext @ DefModule::ExtModule(_) => ext,
        })
    }
}

impl From<Module> for DefModule {
    fn from(m: Module) -> Self {
        DefModule::Module(m)
    }
}

impl From<ExtModule> for DefModule {
    fn from(m: ExtModule) -> Self {
        DefModule::ExtModule(m)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Circuit {
    pub main: String,
    pub modules: Vec<DefModule>,
}

impl Circuit {
    pub fn new(main: impl Into<String>, modules: Vec<DefModule>) -> Self {
        Self {
            main: main.into(),
            modules,
        }
    }

    pub fn module(&self, name: &str) -> Option<&DefModule> {
        self.modules.iter().find(|m| m.name() == name)
    }

    pub fn try_map_modules<E, F>(self, f: F) -> Result<Circuit, E>
    where
        F: FnMut(DefModule) -> Result<DefModule, E>,
    {
        Ok(Circuit {
            main: self.main,
            modules: self.modules.into_iter().map(f).collect::<Result<Vec<_>, E>>()?,
        })
    }
}
