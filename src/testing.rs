//! Model fixtures shared by the unit tests

use crate::attribute;
use crate::state::{Attribute, Binding, Scope, ScopeSet, StateModel};

/// One attribute per scope, two nested lists and two ignored attributes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    pub binding: Binding,
    pub sample_string: Option<String>,
    pub sample_user: Option<String>,
    pub sample_application: bool,
    pub sample_session: Vec<ModelUser>,
    pub users: Vec<ModelUser>,
    pub sample_ignore: Option<String>,
    pub private_field: Option<String>,
}

impl StateModel for Model {
    fn attributes() -> Vec<Attribute<Self>> {
        vec![
            attribute!("sampleString" => scalar sample_string).scoped(Scope::Session),
            attribute!("sampleUser" => scalar sample_user).scoped(Scope::User),
            attribute!("sampleApplication" => scalar sample_application)
                .scoped(Scope::Application),
            attribute!("sampleSession" => list sample_session).scoped(Scope::Session),
            attribute!("users" => list users).scoped(Scope::Session),
            attribute!("sampleIgnore" => scalar sample_ignore)
                .scoped(Scope::Session)
                .ignored(),
            attribute!("privateField" => scalar private_field).ignored(),
        ]
    }

    fn binding(&self) -> &Binding {
        &self.binding
    }

    fn binding_mut(&mut self) -> &mut Binding {
        &mut self.binding
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelUser {
    pub binding: Binding,
    pub field: Option<String>,
}

impl StateModel for ModelUser {
    fn attributes() -> Vec<Attribute<Self>> {
        vec![attribute!("field" => scalar field)
            .scoped(Scope::Session)
            .scoped(Scope::User)]
    }

    fn binding(&self) -> &Binding {
        &self.binding
    }

    fn binding_mut(&mut self) -> &mut Binding {
        &mut self.binding
    }
}

/// A user-scoped nested object
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileModel {
    pub binding: Binding,
    pub home: Option<ModelUser>,
}

impl StateModel for ProfileModel {
    fn attributes() -> Vec<Attribute<Self>> {
        vec![attribute!("home" => nested home).scoped(Scope::User)]
    }

    fn binding(&self) -> &Binding {
        &self.binding
    }

    fn binding_mut(&mut self) -> &mut Binding {
        &mut self.binding
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmptyModel {
    pub binding: Binding,
}

impl StateModel for EmptyModel {
    fn attributes() -> Vec<Attribute<Self>> {
        Vec::new()
    }

    fn binding(&self) -> &Binding {
        &self.binding
    }

    fn binding_mut(&mut self) -> &mut Binding {
        &mut self.binding
    }
}

/// Declares the same ignore matrix on a model type with default scopes
macro_rules! ignore_matrix_model {
    ($name:ident, $scopes:expr) => {
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct $name {
            pub binding: Binding,
            pub sample_string: Option<String>,
            pub sample_ignore: Option<String>,
            pub sample_ignore_session: Option<String>,
            pub sample_ignore_user: Option<String>,
            pub sample_ignore_application: Option<String>,
        }

        impl StateModel for $name {
            fn attributes() -> Vec<Attribute<Self>> {
                vec![
                    attribute!("sampleString" => scalar sample_string),
                    attribute!("sampleIgnore" => scalar sample_ignore).ignored(),
                    attribute!("sampleIgnoreSession" => scalar sample_ignore_session)
                        .ignored_in(Scope::Session),
                    attribute!("sampleIgnoreUser" => scalar sample_ignore_user)
                        .ignored_in(Scope::User),
                    attribute!("sampleIgnoreApplication" => scalar sample_ignore_application)
                        .ignored_in(Scope::Application),
                ]
            }

            fn default_scopes() -> ScopeSet {
                $scopes
            }

            fn binding(&self) -> &Binding {
                &self.binding
            }

            fn binding_mut(&mut self) -> &mut Binding {
                &mut self.binding
            }
        }
    };
}

ignore_matrix_model!(SessionModel, ScopeSet::of(Scope::Session));
ignore_matrix_model!(
    UserModel,
    ScopeSet::of(Scope::Session).with(Scope::User)
);
ignore_matrix_model!(
    ApplicationModel,
    ScopeSet::of(Scope::Session).with(Scope::Application)
);

pub fn user(field: &str) -> ModelUser {
    ModelUser {
        field: Some(field.to_string()),
        ..Default::default()
    }
}

/// A `Model` with every attribute set
pub fn sample_model() -> Model {
    let mut model = Model {
        sample_string: Some("value".to_string()),
        sample_user: Some("user".to_string()),
        sample_application: true,
        sample_session: vec![user("session")],
        users: vec![user("first"), user("second")],
        sample_ignore: Some("ignored".to_string()),
        private_field: Some("private".to_string()),
        ..Default::default()
    };
    model.binding.set_id(Some("sample")).unwrap();
    model
}
