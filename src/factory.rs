//! Creators: compile construction plans for services
//!
//! A [`Creator`] knows how to produce instances of one service. It is asked
//! once for a [`Plan`], a reusable closure that builds an instance given a
//! [`ResolutionContext`], and caches that plan in a [`SetOnce`] so every
//! later request reuses it.
//!
//! Three creators ship with the crate:
//! - [`TypeCreator`] selects a constructor of a [`Constructible`] type and
//!   wires each parameter to its dependency's plan or its default value
//! - [`FactoryCreator`] calls a user-supplied closure
//! - [`InstanceCreator`] hands out an instance that already exists

use crate::cell::SetOnce;
use crate::error::{ConstructorReport, ParameterReport};
use crate::metadata::{Argument, DefaultFn};
use crate::{
    Arguments, BuildContext, Constructible, Constructor, DiError, Injectable, Instance, Parameter,
    ResolutionContext, Result, Upcast,
};
use std::any::TypeId;
use std::marker::PhantomData;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::debug;

/// A compiled construction plan.
pub type Plan = Arc<dyn Fn(&ResolutionContext<'_>) -> Result<Instance> + Send + Sync>;

/// Something that can compile a construction plan for one service.
///
/// Implement this to plug custom creation strategies into
/// [`BindingBuilder::to_creator`](crate::BindingBuilder::to_creator).
pub trait Creator: Send + Sync {
    /// Name of the type this creator produces, for diagnostics.
    fn implementation_name(&self) -> &'static str;

    /// The concrete type constructed, when there is one.
    fn implementation_type(&self) -> Option<TypeId> {
        None
    }

    /// Compile (or return the cached) construction plan.
    ///
    /// `ctx` answers which dependencies are resolvable and compiles their
    /// plans.
    fn plan(&self, ctx: &mut BuildContext<'_>) -> Result<Plan>;
}

// =============================================================================
// Constructor Selection
// =============================================================================

fn report_for<T>(
    constructor: &Constructor<T>,
    resolvable: &impl Fn(&Parameter) -> bool,
) -> ConstructorReport {
    ConstructorReport {
        name: constructor.name(),
        parameters: constructor
            .parameters()
            .iter()
            .map(|parameter| {
                let resolved = resolvable(parameter);
                ParameterReport {
                    name: parameter.name(),
                    type_name: parameter.declared_type(),
                    key: parameter.key().shared_name(),
                    resolved,
                    has_default: parameter.has_default(),
                    used_default: !resolved && parameter.has_default(),
                }
            })
            .collect(),
    }
}

/// Pick the constructor to build `type_name` with.
///
/// A constructor marked with the inject directive wins outright, provided
/// every parameter is resolvable or defaulted. Otherwise, among the
/// constructors whose parameters are all resolvable or defaulted, the one
/// resolving the most parameters from registrations wins; ties go to the
/// earliest declared.
pub(crate) fn select_constructor<T>(
    type_name: &'static str,
    constructors: &[Constructor<T>],
    resolvable: impl Fn(&Parameter) -> bool,
) -> Result<usize> {
    let marked: Vec<usize> = constructors
        .iter()
        .enumerate()
        .filter(|(_, c)| c.is_inject())
        .map(|(index, _)| index)
        .collect();

    if marked.len() > 1 {
        return Err(DiError::AmbiguousConstructorDirective {
            type_name,
            constructors: marked.iter().map(|&i| constructors[i].name()).collect(),
        });
    }

    if let Some(&index) = marked.first() {
        let report = report_for(&constructors[index], &resolvable);
        if let Some(parameter) = report.parameters.into_iter().find(|p| !p.is_satisfied()) {
            return Err(DiError::UnresolvableMarkedConstructor {
                type_name,
                constructor: constructors[index].name(),
                parameter,
            });
        }
        return Ok(index);
    }

    let reports: Vec<ConstructorReport> = constructors
        .iter()
        .map(|c| report_for(c, &resolvable))
        .collect();

    let mut best: Option<(usize, usize)> = None;
    for (index, report) in reports.iter().enumerate() {
        if !report.is_usable() {
            continue;
        }
        let score = report.parameters.iter().filter(|p| p.resolved).count();
        if best.is_none_or(|(_, top)| score > top) {
            best = Some((index, score));
        }
    }

    match best {
        Some((index, _)) => Ok(index),
        None => Err(DiError::NoUsableConstructor {
            type_name,
            constructors: reports,
        }),
    }
}

// =============================================================================
// Argument Sources
// =============================================================================

/// Where one constructor argument comes from at run time.
enum ArgumentSource {
    Dependency {
        parameter: &'static str,
        declared_type: &'static str,
        plan: Plan,
    },
    Collection {
        parameter: &'static str,
        declared_type: &'static str,
        plans: Vec<Plan>,
    },
    Default(DefaultFn),
}

impl ArgumentSource {
    fn compile(
        parameter: &Parameter,
        required_by: &'static str,
        ctx: &mut BuildContext<'_>,
    ) -> Result<Self> {
        let wrap = |err: DiError| {
            err.required_by(parameter.name(), required_by, parameter.declared_type())
        };

        if parameter.is_collection() {
            let plans = ctx.plans_for_all(parameter.key()).map_err(wrap)?;
            return Ok(Self::Collection {
                parameter: parameter.name(),
                declared_type: parameter.declared_type(),
                plans,
            });
        }

        if ctx.can_resolve(parameter.key()) {
            let plan = ctx.plan_for(parameter.key()).map_err(wrap)?;
            return Ok(Self::Dependency {
                parameter: parameter.name(),
                declared_type: parameter.declared_type(),
                plan,
            });
        }

        match parameter.default_fn() {
            Some(default) => Ok(Self::Default(Arc::clone(default))),
            None => Err(wrap(DiError::no_registration(parameter.key().clone()))),
        }
    }

    fn produce(&self, ctx: &ResolutionContext<'_>, required_by: &'static str) -> Result<Argument> {
        match self {
            Self::Dependency {
                parameter,
                declared_type,
                plan,
            } => plan(ctx)
                .map(Argument::Single)
                .map_err(|err| err.required_by(*parameter, required_by, *declared_type)),
            Self::Collection {
                parameter,
                declared_type,
                plans,
            } => plans
                .iter()
                .map(|plan| plan(ctx))
                .collect::<Result<Vec<_>>>()
                .map(Argument::Collection)
                .map_err(|err| err.required_by(*parameter, required_by, *declared_type)),
            Self::Default(default) => Ok(Argument::Single(default())),
        }
    }
}

// =============================================================================
// Type Creator
// =============================================================================

/// Builds `C` through one of its constructors and exposes it as service `S`.
pub struct TypeCreator<C, S: ?Sized = C> {
    plan: SetOnce<Plan>,
    _types: PhantomData<fn() -> (Arc<C>, Arc<S>)>,
}

impl<C, S: ?Sized> TypeCreator<C, S>
where
    C: Constructible + Upcast<S>,
    S: Injectable,
{
    /// Create a type creator with an empty plan cache.
    #[inline]
    pub fn new() -> Self {
        Self {
            plan: SetOnce::new(),
            _types: PhantomData,
        }
    }
}

impl<C, S: ?Sized> Default for TypeCreator<C, S>
where
    C: Constructible + Upcast<S>,
    S: Injectable,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<C, S: ?Sized> Creator for TypeCreator<C, S>
where
    C: Constructible + Upcast<S>,
    S: Injectable,
{
    fn implementation_name(&self) -> &'static str {
        std::any::type_name::<C>()
    }

    fn implementation_type(&self) -> Option<TypeId> {
        Some(TypeId::of::<C>())
    }

    fn plan(&self, ctx: &mut BuildContext<'_>) -> Result<Plan> {
        if let Some(plan) = self.plan.get() {
            return Ok(Arc::clone(plan));
        }

        let type_name = std::any::type_name::<C>();
        let mut constructors = C::constructors();
        let index = select_constructor(type_name, &constructors, |p| ctx.can_resolve_parameter(p))?;
        let constructor = constructors.swap_remove(index);

        let sources = constructor
            .parameters()
            .iter()
            .map(|parameter| ArgumentSource::compile(parameter, type_name, ctx))
            .collect::<Result<Vec<_>>>()?;

        let constructor_name = constructor.name();
        let invoke = constructor.invoker();

        #[cfg(feature = "logging")]
        debug!(
            target: "ioc_container",
            service = type_name,
            constructor = constructor_name,
            parameters = sources.len(),
            "Compiled construction plan"
        );

        let plan: Plan = Arc::new(move |ctx: &ResolutionContext<'_>| {
            let mut values = Vec::with_capacity(sources.len());
            for source in &sources {
                values.push(source.produce(ctx, type_name)?);
            }
            let mut args = Arguments::new(values, type_name, constructor_name);
            let instance = invoke(&mut args)?;
            Ok(Instance::new::<S>(<C as Upcast<S>>::upcast(Arc::new(instance))))
        });

        Ok(Arc::clone(self.plan.publish(plan)))
    }
}

// =============================================================================
// Factory Creator
// =============================================================================

/// Type-erased factory function
type FactoryFn<S> = Arc<dyn Fn(&ResolutionContext<'_>) -> Result<Arc<S>> + Send + Sync>;

/// Produces `S` by calling a user-supplied factory.
///
/// The factory receives the [`ResolutionContext`] so it can resolve its own
/// dependencies.
pub struct FactoryCreator<S: ?Sized> {
    factory: FactoryFn<S>,
    plan: SetOnce<Plan>,
}

impl<S: ?Sized + Injectable> FactoryCreator<S> {
    /// Wrap a factory.
    #[inline]
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(&ResolutionContext<'_>) -> Result<Arc<S>> + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(factory),
            plan: SetOnce::new(),
        }
    }
}

impl<S: ?Sized + Injectable> Creator for FactoryCreator<S> {
    fn implementation_name(&self) -> &'static str {
        std::any::type_name::<S>()
    }

    fn plan(&self, _ctx: &mut BuildContext<'_>) -> Result<Plan> {
        if let Some(plan) = self.plan.get() {
            return Ok(Arc::clone(plan));
        }

        let factory = Arc::clone(&self.factory);
        let plan: Plan =
            Arc::new(move |ctx: &ResolutionContext<'_>| factory(ctx).map(Instance::new::<S>));

        Ok(Arc::clone(self.plan.publish(plan)))
    }
}

// =============================================================================
// Instance Creator
// =============================================================================

/// Hands out an existing instance; nothing is constructed.
pub struct InstanceCreator {
    instance: Instance,
    plan: SetOnce<Plan>,
}

impl InstanceCreator {
    /// Wrap an existing service handle.
    #[inline]
    pub fn new<S: ?Sized + Injectable>(instance: Arc<S>) -> Self {
        Self {
            instance: Instance::new(instance),
            plan: SetOnce::new(),
        }
    }
}

impl Creator for InstanceCreator {
    fn implementation_name(&self) -> &'static str {
        self.instance.type_name()
    }

    fn plan(&self, _ctx: &mut BuildContext<'_>) -> Result<Plan> {
        if let Some(plan) = self.plan.get() {
            return Ok(Arc::clone(plan));
        }

        let instance = self.instance.clone();
        let plan: Plan = Arc::new(move |_: &ResolutionContext<'_>| Ok(instance.clone()));

        Ok(Arc::clone(self.plan.publish(plan)))
    }
}
