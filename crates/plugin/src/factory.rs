//! Plugin factories backed by registered constructors.

use std::path::PathBuf;
use std::sync::Arc;

use rivet_core::TypeName;
use rivet_engine::{Plugin, PluginError, PluginFactory};

use crate::error::ResolutionError;
use crate::loader::LoadingContext;
use crate::registry::{ArgumentValue, Arguments, Constructor, ParameterType, PluginDescriptor};

/// Supplies a value for a constructor parameter.
#[derive(Debug, Clone)]
pub enum ArgumentResolver {
    /// Binds the parameter at `index`, converting `value` to its type.
    ForIndex { index: usize, value: String },

    /// Binds every parameter of the given type.
    ForType(ArgumentValue),
}

/// Outcome of asking a resolver for a parameter.
#[derive(Debug)]
enum Resolution {
    Unresolved,
    Resolved(ArgumentValue),
    Invalid { index: usize, value: String },
}

impl ArgumentResolver {
    fn resolve(&self, index: usize, parameter: ParameterType) -> Resolution {
        match self {
            Self::ForIndex { index: bound, value } if *bound == index => convert(index, value, parameter),
            Self::ForIndex { .. } => Resolution::Unresolved,
            Self::ForType(argument) if argument.parameter_type() == parameter => {
                Resolution::Resolved(argument.clone())
            }
            Self::ForType(_) => Resolution::Unresolved,
        }
    }
}

fn convert(index: usize, value: &str, parameter: ParameterType) -> Resolution {
    let invalid = || Resolution::Invalid {
        index,
        value: value.to_string(),
    };

    match parameter {
        ParameterType::Path => Resolution::Resolved(ArgumentValue::Path(PathBuf::from(value))),
        ParameterType::String => Resolution::Resolved(ArgumentValue::String(value.to_string())),
        ParameterType::Integer => match value.trim().parse() {
            Ok(integer) => Resolution::Resolved(ArgumentValue::Integer(integer)),
            Err(_) => invalid(),
        },
        ParameterType::Boolean => match value.trim().to_ascii_lowercase().as_str() {
            "true" => Resolution::Resolved(ArgumentValue::Boolean(true)),
            "false" => Resolution::Resolved(ArgumentValue::Boolean(false)),
            _ => invalid(),
        },
        ParameterType::BuildLogger => Resolution::Unresolved,
    }
}

/// A constructor whose every parameter could be bound.
struct Candidate<'a> {
    constructor: &'a Constructor,
    arguments: Vec<ArgumentValue>,
}

/// Creates plugin instances through the best matching registered constructor.
///
/// The constructor is selected when the factory is built, so a plugin that
/// cannot be constructed fails resolution before any unit is touched.
pub struct RegisteredFactory {
    declared: String,
    name: TypeName,
    constructor: Constructor,
    arguments: Arguments,
    context: Arc<LoadingContext>,
}

impl RegisteredFactory {
    /// Selects the constructor of `descriptor` to use with `resolvers`.
    ///
    /// Resolvers are consulted in order; the first one that can bind a
    /// parameter decides its value.
    pub fn new(
        declared: impl Into<String>,
        descriptor: &PluginDescriptor,
        resolvers: &[ArgumentResolver],
        context: Arc<LoadingContext>,
    ) -> Result<Self, ResolutionError> {
        let name = descriptor.name().clone();
        let mut candidates = Vec::new();
        let mut invalid = None;

        'constructors: for constructor in descriptor.constructors() {
            let mut arguments = Vec::with_capacity(constructor.parameters().len());
            for (index, parameter) in constructor.parameters().iter().enumerate() {
                let resolution = resolvers
                    .iter()
                    .map(|resolver| resolver.resolve(index, *parameter))
                    .find(|resolution| !matches!(resolution, Resolution::Unresolved));

                match resolution {
                    Some(Resolution::Resolved(argument)) => arguments.push(argument),
                    Some(Resolution::Invalid { index, value }) => {
                        invalid.get_or_insert((index, value, *parameter));
                        continue 'constructors;
                    }
                    Some(Resolution::Unresolved) | None => continue 'constructors,
                }
            }
            candidates.push(Candidate {
                constructor,
                arguments,
            });
        }

        let Some(best) = candidates.iter().map(rank).max() else {
            return Err(match invalid {
                Some((index, value, expected)) => ResolutionError::InvalidArgument {
                    name,
                    index,
                    value,
                    expected,
                },
                None => ResolutionError::NoResolvableConstructor(name),
            });
        };

        let mut best_candidates = candidates.into_iter().filter(|c| rank(c) == best);
        let selected = best_candidates
            .next()
            .ok_or_else(|| ResolutionError::NoResolvableConstructor(name.clone()))?;
        let ties = best_candidates.count();
        if ties > 0 {
            return Err(ResolutionError::AmbiguousConstructors {
                name,
                count: ties + 1,
            });
        }

        tracing::debug!(
            "Selected constructor {:?} of {}",
            selected.constructor.parameters(),
            name
        );
        Ok(Self {
            declared: declared.into(),
            name,
            constructor: selected.constructor.clone(),
            arguments: Arguments::new(selected.arguments),
            context,
        })
    }

    pub fn name(&self) -> &TypeName {
        &self.name
    }

    /// The loading context the plugin type was found in.
    pub fn context(&self) -> &Arc<LoadingContext> {
        &self.context
    }

    /// The arguments the selected constructor receives.
    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }
}

fn rank(candidate: &Candidate<'_>) -> (i32, usize) {
    (
        candidate.constructor.priority(),
        candidate.constructor.parameters().len(),
    )
}

impl PluginFactory for RegisteredFactory {
    fn declared_name(&self) -> &str {
        &self.declared
    }

    fn make(&self) -> Result<Arc<dyn Plugin>, PluginError> {
        self.constructor.construct(&self.arguments)
    }
}

impl std::fmt::Debug for RegisteredFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredFactory")
            .field("declared", &self.declared)
            .field("constructor", &self.constructor)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rivet_core::ClasspathSet;
    use rivet_engine::{TypeDescription, TypePool, UnitBuilder};

    #[derive(Debug)]
    struct Configured {
        label: String,
    }

    impl Plugin for Configured {
        fn name(&self) -> &str {
            &self.label
        }

        fn matches(&self, _target: &TypeDescription) -> bool {
            false
        }

        fn apply(
            &self,
            _builder: &mut UnitBuilder,
            _target: &TypeDescription,
            _pool: &TypePool<'_>,
        ) -> Result<(), PluginError> {
            Ok(())
        }
    }

    fn labelled(label: &'static str, parameters: Vec<ParameterType>) -> Constructor {
        Constructor::new(parameters, move |_| {
            Ok(Arc::new(Configured {
                label: label.to_string(),
            }))
        })
    }

    fn context() -> Arc<LoadingContext> {
        Arc::new(LoadingContext::open(ClasspathSet::default()))
    }

    fn root() -> ArgumentResolver {
        ArgumentResolver::ForType(ArgumentValue::Path(PathBuf::from("/classes")))
    }

    #[test]
    fn test_prefers_most_parameters() {
        let descriptor = PluginDescriptor::new("com.example.P")
            .with_constructor(labelled("none", vec![]))
            .with_constructor(labelled("path", vec![ParameterType::Path]));

        let factory = RegisteredFactory::new("com.example.P", &descriptor, &[root()], context()).unwrap();
        assert_eq!(factory.make().unwrap().name(), "path");
        assert_eq!(factory.arguments().path(0).unwrap(), PathBuf::from("/classes"));
    }

    #[test]
    fn test_priority_wins_over_parameter_count() {
        let descriptor = PluginDescriptor::new("com.example.P")
            .with_constructor(labelled("none", vec![]).with_priority(1))
            .with_constructor(labelled("path", vec![ParameterType::Path]));

        let factory = RegisteredFactory::new("com.example.P", &descriptor, &[root()], context()).unwrap();
        assert_eq!(factory.make().unwrap().name(), "none");
    }

    #[test]
    fn test_index_arguments_come_first() {
        let descriptor = PluginDescriptor::new("com.example.P").with_constructor(Constructor::new(
            vec![ParameterType::Path, ParameterType::Integer],
            |arguments| {
                Ok(Arc::new(Configured {
                    label: format!(
                        "{}:{}",
                        arguments.path(0)?.display(),
                        arguments.integer(1)?
                    ),
                }))
            },
        ));
        let resolvers = [
            ArgumentResolver::ForIndex {
                index: 0,
                value: "/custom".to_string(),
            },
            ArgumentResolver::ForIndex {
                index: 1,
                value: "42".to_string(),
            },
            root(),
        ];

        let factory = RegisteredFactory::new("com.example.P", &descriptor, &resolvers, context()).unwrap();
        assert_eq!(factory.make().unwrap().name(), "/custom:42");
    }

    #[test]
    fn test_unresolvable_and_ambiguous_constructors() {
        let unresolvable = PluginDescriptor::new("com.example.P")
            .with_constructor(labelled("string", vec![ParameterType::String]));
        assert!(matches!(
            RegisteredFactory::new("com.example.P", &unresolvable, &[root()], context()),
            Err(ResolutionError::NoResolvableConstructor(_))
        ));

        let ambiguous = PluginDescriptor::new("com.example.P")
            .with_constructor(labelled("a", vec![ParameterType::Path]))
            .with_constructor(labelled("b", vec![ParameterType::Path]));
        assert!(matches!(
            RegisteredFactory::new("com.example.P", &ambiguous, &[root()], context()),
            Err(ResolutionError::AmbiguousConstructors { count: 2, .. })
        ));
    }

    #[test]
    fn test_invalid_argument() {
        let descriptor = PluginDescriptor::new("com.example.P")
            .with_constructor(labelled("int", vec![ParameterType::Integer]));
        let resolvers = [ArgumentResolver::ForIndex {
            index: 0,
            value: "abc".to_string(),
        }];

        let err = RegisteredFactory::new("com.example.P", &descriptor, &resolvers, context())
            .err()
            .unwrap();
        assert!(matches!(
            err,
            ResolutionError::InvalidArgument {
                index: 0,
                expected: ParameterType::Integer,
                ..
            }
        ));
    }
}
