/*! Fluent API for constructing circuits programmatically.
 *
 * Hand-assembling nested statements and port lists is noisy, especially in tests. These builders keep
 * declarations in order and produce well-formed modules and circuits in a few chained calls.
 */

use crate::{
    circuit::{Circuit, DefModule, Direction, ExtModule, Module, Port},
    expr::Expression,
    stmt::{RegReset, Statement},
    types::Type,
};

pub struct ModuleBuilder {
    name: String,
    ports: Vec<Port>,
    body: Vec<Statement>,
}

impl ModuleBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ports: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn input(mut self, name: impl Into<String>, ty: Type) -> Self {
        self.ports.push(Port::new(name, Direction::Input, ty));
        self
    }

    pub fn output(mut self, name: impl Into<String>, ty: Type) -> Self {
        self.ports.push(Port::new(name, Direction::Output, ty));
        self
    }

    pub fn wire(mut self, name: impl Into<String>, ty: Type) -> Self {
        self.body.push(Statement::Wire {
            name: name.into(),
            ty,
        });
        self
    }

    pub fn register(
        mut self,
        name: impl Into<String>,
        ty: Type,
        clock: Expression,
        reset: Option<(Expression, Expression)>,
    ) -> Self {
        self.body.push(Statement::Register {
            name: name.into(),
            ty,
            clock,
            reset: reset.map(|(signal, init)| RegReset { signal, init }),
        });
        self
    }

    pub fn node(mut self, name: impl Into<String>, value: Expression) -> Self {
        self.body.push(Statement::node(name, value));
        self
    }

    pub fn connect(mut self, loc: Expression, expr: Expression) -> Self {
        self.body.push(Statement::Connect { loc, expr });
        self
    }

    pub fn partial_connect(mut self, loc: Expression, expr: Expression) -> Self {
        self.body.push(Statement::PartialConnect { loc, expr });
        self
    }

    pub fn when(mut self, pred: Expression, conseq: Statement, alt: Statement) -> Self {
        self.body.push(Statement::when(pred, conseq, alt));
        self
    }

    pub fn stmt(mut self, stmt: Statement) -> Self {
        self.body.push(stmt);
        self
    }

    /// Reference to a port or declaration added so far, typed from its declaration.
    pub fn port_ref(&self, name: &str) -> Option<Expression> {
        self.ports
            .iter()
            .find(|p| p.name == name)
            .map(|p| Expression::reference(p.name.clone(), p.ty.clone()))
    }

    pub fn build(self) -> DefModule {
        DefModule::Module(Module {
            name: self.name,
            ports: self.ports,
            body: Statement::Block(self.body),
        })
    }

    pub fn build_external(self) -> DefModule {
        DefModule::ExtModule(ExtModule {
            name: self.name,
            ports: self.ports,
        })
    }
}

pub struct CircuitBuilder {
    main: String,
    modules: Vec<DefModule>,
}

impl CircuitBuilder {
    pub fn new(main: impl Into<String>) -> Self {
        Self {
            main: main.into(),
            modules: Vec::new(),
        }
    }

    pub fn module(mut self, module: DefModule) -> Self {
        self.modules.push(module);
        self
    }

    pub fn build(self) -> Circuit {
        Circuit::new(self.main, self.modules)
    }
}
