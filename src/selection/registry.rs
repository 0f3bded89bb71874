//! Declaration registry
//!
//! Holds the declarations of every registered test class and method. Class
//! and method declarations are independent: either may be missing, and a
//! missing declaration only means "no constraint from this source".

use super::declaration::{TestDeclaration, TestId};
use std::collections::HashMap;
use std::sync::Arc;

/// Lookup of class-level and method-level declarations
///
/// The selection engine reads declarations only through this trait, so any
/// static registration mechanism can back it.
pub trait DeclarationSource {
    /// Declaration attached to a test class, if any
    fn class_declaration(&self, class: &str) -> Option<&TestDeclaration>;

    /// Declaration attached to a single test method, if any
    fn method_declaration(&self, id: &TestId) -> Option<&TestDeclaration>;
}

impl<S: DeclarationSource + ?Sized> DeclarationSource for &S {
    fn class_declaration(&self, class: &str) -> Option<&TestDeclaration> {
        (**self).class_declaration(class)
    }

    fn method_declaration(&self, id: &TestId) -> Option<&TestDeclaration> {
        (**self).method_declaration(id)
    }
}

impl<S: DeclarationSource + ?Sized> DeclarationSource for Arc<S> {
    fn class_declaration(&self, class: &str) -> Option<&TestDeclaration> {
        (**self).class_declaration(class)
    }

    fn method_declaration(&self, id: &TestId) -> Option<&TestDeclaration> {
        (**self).method_declaration(id)
    }
}

/// A registered test method
#[derive(Debug, Clone)]
pub struct RegisteredMethod {
    name: String,
    declaration: Option<TestDeclaration>,
}

impl RegisteredMethod {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declaration(&self) -> Option<&TestDeclaration> {
        self.declaration.as_ref()
    }
}

/// A registered test class and its methods, in registration order
#[derive(Debug, Clone)]
pub struct RegisteredClass {
    name: String,
    device_bound: bool,
    declaration: Option<TestDeclaration>,
    methods: Vec<RegisteredMethod>,
    method_index: HashMap<String, usize>,
}

impl RegisteredClass {
    fn new(name: String, device_bound: bool) -> Self {
        Self {
            name,
            device_bound,
            declaration: None,
            methods: Vec::new(),
            method_index: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether instances of this class are bound to a device from the matrix
    pub fn is_device_bound(&self) -> bool {
        self.device_bound
    }

    pub fn declaration(&self) -> Option<&TestDeclaration> {
        self.declaration.as_ref()
    }

    pub fn methods(&self) -> impl Iterator<Item = &RegisteredMethod> {
        self.methods.iter()
    }

    fn method(&self, name: &str) -> Option<&RegisteredMethod> {
        self.method_index.get(name).map(|&i| &self.methods[i])
    }
}

/// In-memory registry of test classes, methods and their declarations
#[derive(Debug, Clone, Default)]
pub struct DeclarationRegistry {
    classes: Vec<RegisteredClass>,
    class_index: HashMap<String, usize>,
}

impl DeclarationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device-bound test class
    ///
    /// Registering the same class again replaces its declaration and keeps
    /// its methods.
    pub fn register_class(
        &mut self,
        class: impl Into<String>,
        declaration: Option<TestDeclaration>,
    ) -> &mut Self {
        let entry = self.class_entry(class.into(), true);
        entry.device_bound = true;
        entry.declaration = declaration;
        self
    }

    /// Register a test class whose instances are not bound to a device
    pub fn register_unbound_class(
        &mut self,
        class: impl Into<String>,
        declaration: Option<TestDeclaration>,
    ) -> &mut Self {
        let entry = self.class_entry(class.into(), false);
        entry.device_bound = false;
        entry.declaration = declaration;
        self
    }

    /// Register a test method
    ///
    /// The owning class is registered as device-bound, without a declaration,
    /// if it is not known yet. Registering the same method again replaces its
    /// declaration and keeps its position.
    pub fn register_method(
        &mut self,
        class: impl Into<String>,
        method: impl Into<String>,
        declaration: Option<TestDeclaration>,
    ) -> &mut Self {
        let entry = self.class_entry(class.into(), true);
        let method = method.into();
        match entry.method_index.get(&method) {
            Some(&i) => entry.methods[i].declaration = declaration,
            None => {
                entry.method_index.insert(method.clone(), entry.methods.len());
                entry.methods.push(RegisteredMethod {
                    name: method,
                    declaration,
                });
            }
        }
        self
    }

    pub fn class(&self, class: &str) -> Option<&RegisteredClass> {
        self.class_index.get(class).map(|&i| &self.classes[i])
    }

    pub fn classes(&self) -> impl Iterator<Item = &RegisteredClass> {
        self.classes.iter()
    }

    /// Every registered test, classes and methods in registration order
    pub fn test_ids(&self) -> Vec<TestId> {
        self.classes
            .iter()
            .flat_map(|class| {
                class
                    .methods
                    .iter()
                    .map(|method| TestId::new(class.name.clone(), method.name.clone()))
            })
            .collect()
    }

    /// Number of registered test methods
    pub fn len(&self) -> usize {
        self.classes.iter().map(|class| class.methods.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn class_entry(&mut self, class: String, device_bound: bool) -> &mut RegisteredClass {
        let index = match self.class_index.get(&class) {
            Some(&i) => i,
            None => {
                let i = self.classes.len();
                self.class_index.insert(class.clone(), i);
                self.classes.push(RegisteredClass::new(class, device_bound));
                i
            }
        };
        &mut self.classes[index]
    }
}

impl DeclarationSource for DeclarationRegistry {
    fn class_declaration(&self, class: &str) -> Option<&TestDeclaration> {
        self.class(class)?.declaration()
    }

    fn method_declaration(&self, id: &TestId) -> Option<&TestDeclaration> {
        self.class(id.class())?.method(id.method())?.declaration()
    }
}
