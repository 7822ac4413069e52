//! Pattern data model for the specialization resolver
//!
//! Patterns are plain owned data: a pattern owns its parameters and the
//! argument terms built from them, and refers to other patterns only through
//! [`PatternId`]s handed out by the registry.

use bitflags::bitflags;
use indexmap::IndexMap;
use std::fmt;

/// Position of a parameter within its pattern's parameter list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamId(pub u32);

impl ParamId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identifier of a registered pattern, assigned in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatternId(pub u32);

impl PatternId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Name of a leaf type or template, opaque to the engine
///
/// Two names are only ever compared through [`crate::model::TypeModel::equal_leaf`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeName(pub String);

impl TypeName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a parameter stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// A type (`typename T`)
    Type,
    /// A constant value (`size_t N`)
    Value,
    /// Another parameterized pattern (`template<typename> class C`)
    Nested,
}

/// Whether a family behaves like a class template or a set of function overloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FamilyFlavor {
    /// One primary, partial and explicit specializations, exact argument shapes
    Class,
    /// Several overload primaries and explicit specializations, call-site deduction
    Function,
}

impl fmt::Display for FamilyFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FamilyFlavor::Class => f.write_str("class-like"),
            FamilyFlavor::Function => f.write_str("function-like"),
        }
    }
}

/// A declared parameter of a pattern
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub kind: ParamKind,
    /// Declared type of a value parameter (`None` accepts any constant)
    pub value_type: Option<TypeName>,
    /// Default argument, which may mention earlier parameters
    pub default: Option<Term>,
    /// Accepts zero or more arguments of its kind
    pub pack: bool,
}

impl Parameter {
    fn new(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            value_type: None,
            default: None,
            pack: false,
        }
    }

    /// A type parameter
    pub fn ty(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Type)
    }

    /// A value parameter of the given declared type
    pub fn value(name: impl Into<String>, value_type: impl Into<String>) -> Self {
        Self {
            value_type: Some(TypeName::new(value_type)),
            ..Self::new(name, ParamKind::Value)
        }
    }

    /// A nested-pattern parameter
    pub fn nested(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Nested)
    }

    pub fn with_default(mut self, default: Term) -> Self {
        self.default = Some(default);
        self
    }

    pub fn packed(mut self) -> Self {
        self.pack = true;
        self
    }
}

impl Parameter {
    /// Declaration text; `siblings` names parameters mentioned by the default
    pub fn declaration(&self, siblings: &[Parameter]) -> String {
        let dots = if self.pack { "..." } else { "" };
        let mut text = match self.kind {
            ParamKind::Type => format!("typename{dots} {}", self.name),
            ParamKind::Value => {
                let ty = self.value_type.as_ref().map_or("auto", TypeName::name);
                format!("{ty}{dots} {}", self.name)
            }
            ParamKind::Nested => format!("template<typename> class{dots} {}", self.name),
        };
        if let Some(default) = &self.default {
            text.push_str(&format!(" = {}", default.display(siblings)));
        }
        text
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.declaration(&[]))
    }
}

bitflags! {
    /// cv-qualification decorating a type
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Qualifiers: u8 {
        const CONST = 0b01;
        const VOLATILE = 0b10;
    }
}

impl fmt::Display for Qualifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut words = Vec::new();
        if self.contains(Qualifiers::CONST) {
            words.push("const");
        }
        if self.contains(Qualifiers::VOLATILE) {
            words.push("volatile");
        }
        f.write_str(&words.join(" "))
    }
}

/// Reference decoration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    /// `T&`
    Lvalue,
    /// `T&&`
    Rvalue,
}

/// Placeholder handed out by the synthetic substitution generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SyntheticToken {
    pub id: u64,
    pub kind: ParamKind,
}

/// An argument expression built from leaf types, constants and parameters
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    /// Reference to a parameter of the enclosing pattern
    Param(ParamId),
    /// Unique placeholder used while ordering patterns
    Synthetic(SyntheticToken),
    /// Leaf type: `int`, `std::string`
    Type(TypeName),
    /// Constant value of a declared type: `5`
    Value { value: i64, ty: TypeName },
    /// Template name passed as an argument: `std::vector`
    Template(TypeName),
    /// Template-id: `B<T, int>`, `C<U>` for a nested parameter `C`
    Apply { head: Box<Term>, args: Vec<Term> },
    /// `T*`
    Pointer(Box<Term>),
    /// `const T`, `volatile T`
    Qualified { quals: Qualifiers, inner: Box<Term> },
    /// `T&`, `T&&`
    Reference { kind: RefKind, inner: Box<Term> },
    /// Pack expansion `T...`
    Expansion(Box<Term>),
    /// Value expression `X + delta`; never deduced from
    Offset { base: Box<Term>, delta: i64 },
}

impl Term {
    pub fn param(index: u32) -> Self {
        Term::Param(ParamId(index))
    }

    pub fn ty(name: impl Into<String>) -> Self {
        Term::Type(TypeName::new(name))
    }

    pub fn value(value: i64, ty: impl Into<String>) -> Self {
        Term::Value {
            value,
            ty: TypeName::new(ty),
        }
    }

    pub fn template(name: impl Into<String>) -> Self {
        Term::Template(TypeName::new(name))
    }

    /// `name<args...>`
    pub fn apply(name: impl Into<String>, args: Vec<Term>) -> Self {
        Term::Apply {
            head: Box::new(Term::template(name)),
            args,
        }
    }

    /// `head<args...>` with an arbitrary head, such as a nested parameter
    pub fn apply_to(head: Term, args: Vec<Term>) -> Self {
        Term::Apply {
            head: Box::new(head),
            args,
        }
    }

    pub fn pointer(inner: Term) -> Self {
        Term::Pointer(Box::new(inner))
    }

    /// Adds qualifiers, merging with existing ones; qualifiers on a reference are dropped
    pub fn cv(quals: Qualifiers, inner: Term) -> Self {
        if quals.is_empty() {
            return inner;
        }
        match inner {
            Term::Qualified {
                quals: existing,
                inner,
            } => Term::Qualified {
                quals: existing | quals,
                inner,
            },
            reference @ Term::Reference { .. } => reference,
            inner => Term::Qualified {
                quals,
                inner: Box::new(inner),
            },
        }
    }

    pub fn constant(inner: Term) -> Self {
        Term::cv(Qualifiers::CONST, inner)
    }

    /// Builds a reference, collapsing references to references
    pub fn reference(kind: RefKind, inner: Term) -> Self {
        match inner {
            Term::Reference {
                kind: existing,
                inner,
            } => {
                let kind = if kind == RefKind::Lvalue || existing == RefKind::Lvalue {
                    RefKind::Lvalue
                } else {
                    RefKind::Rvalue
                };
                Term::Reference { kind, inner }
            }
            inner => Term::Reference {
                kind,
                inner: Box::new(inner),
            },
        }
    }

    pub fn lvalue_ref(inner: Term) -> Self {
        Term::reference(RefKind::Lvalue, inner)
    }

    pub fn rvalue_ref(inner: Term) -> Self {
        Term::reference(RefKind::Rvalue, inner)
    }

    pub fn expand(inner: Term) -> Self {
        Term::Expansion(Box::new(inner))
    }

    /// `base + delta`, folded when `base` is already a constant
    ///
    /// A sum that does not fit stays unfolded and so never equals a value.
    pub fn offset(base: Term, delta: i64) -> Self {
        match base {
            Term::Value { value, ty } => match value.checked_add(delta) {
                Some(value) => Term::Value { value, ty },
                None => Term::Offset {
                    base: Box::new(Term::Value { value, ty }),
                    delta,
                },
            },
            base => Term::Offset {
                base: Box::new(base),
                delta,
            },
        }
    }

    /// Splits off top-level qualification
    pub fn split_qualifiers(&self) -> (Qualifiers, &Term) {
        match self {
            Term::Qualified { quals, inner } => (*quals, inner),
            other => (Qualifiers::empty(), other),
        }
    }

    /// Splits off a top-level reference
    pub fn strip_reference(&self) -> (Option<RefKind>, &Term) {
        match self {
            Term::Reference { kind, inner } => (Some(*kind), inner),
            other => (None, other),
        }
    }

    /// Top-level reference and qualification removed
    pub fn undecorated(&self) -> &Term {
        self.strip_reference().1.split_qualifiers().1
    }

    /// Copy with every reference and qualifier removed, at any depth
    pub fn erase_decorations(&self) -> Term {
        match self {
            Term::Qualified { inner, .. } | Term::Reference { inner, .. } => {
                inner.erase_decorations()
            }
            Term::Pointer(inner) => Term::pointer(inner.erase_decorations()),
            Term::Expansion(inner) => Term::expand(inner.erase_decorations()),
            Term::Apply { head, args } => Term::apply_to(
                head.erase_decorations(),
                args.iter().map(Term::erase_decorations).collect(),
            ),
            Term::Offset { base, delta } => Term::offset(base.erase_decorations(), *delta),
            leaf => leaf.clone(),
        }
    }

    /// Whether this term denotes a type (as opposed to a value or template name)
    pub fn is_type_like(&self) -> bool {
        match self {
            Term::Type(_)
            | Term::Apply { .. }
            | Term::Pointer(_)
            | Term::Qualified { .. }
            | Term::Reference { .. } => true,
            Term::Synthetic(token) => token.kind == ParamKind::Type,
            _ => false,
        }
    }

    /// Every parameter mentioned, in first-occurrence order
    pub fn parameters(&self) -> Vec<ParamId> {
        let mut found = Vec::new();
        self.collect_parameters(&mut found, true);
        found
    }

    /// Parameters mentioned in positions they can be deduced from
    pub fn deducible_parameters(&self) -> Vec<ParamId> {
        let mut found = Vec::new();
        self.collect_parameters(&mut found, false);
        found
    }

    fn collect_parameters(&self, found: &mut Vec<ParamId>, include_offsets: bool) {
        match self {
            Term::Param(id) => {
                if !found.contains(id) {
                    found.push(*id);
                }
            }
            Term::Pointer(inner)
            | Term::Expansion(inner)
            | Term::Qualified { inner, .. }
            | Term::Reference { inner, .. } => inner.collect_parameters(found, include_offsets),
            Term::Apply { head, args } => {
                head.collect_parameters(found, include_offsets);
                for arg in args {
                    arg.collect_parameters(found, include_offsets);
                }
            }
            Term::Offset { base, .. } => {
                if include_offsets {
                    base.collect_parameters(found, include_offsets);
                }
            }
            Term::Synthetic(_) | Term::Type(_) | Term::Value { .. } | Term::Template(_) => {}
        }
    }

    /// Calls `visit` on every nested argument list, top-level list excluded
    pub(crate) fn for_each_nested_list(&self, visit: &mut dyn FnMut(&[Term])) {
        match self {
            Term::Apply { head, args } => {
                head.for_each_nested_list(visit);
                visit(args);
                for arg in args {
                    arg.for_each_nested_list(visit);
                }
            }
            Term::Pointer(inner)
            | Term::Expansion(inner)
            | Term::Qualified { inner, .. }
            | Term::Reference { inner, .. } => inner.for_each_nested_list(visit),
            Term::Offset { base, .. } => base.for_each_nested_list(visit),
            _ => {}
        }
    }

    /// Renders the term with parameter names taken from `parameters`
    pub fn display<'a>(&'a self, parameters: &'a [Parameter]) -> TermDisplay<'a> {
        TermDisplay {
            term: self,
            parameters,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_term(f, self, &[])
    }
}

/// [`Term`] paired with the parameter list that names its parameters
pub struct TermDisplay<'a> {
    term: &'a Term,
    parameters: &'a [Parameter],
}

impl fmt::Display for TermDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_term(f, self.term, self.parameters)
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, terms: &[Term], parameters: &[Parameter]) -> fmt::Result {
    for (index, term) in terms.iter().enumerate() {
        if index > 0 {
            f.write_str(", ")?;
        }
        write_term(f, term, parameters)?;
    }
    Ok(())
}

fn write_term(f: &mut fmt::Formatter<'_>, term: &Term, parameters: &[Parameter]) -> fmt::Result {
    match term {
        Term::Param(id) => match parameters.get(id.index()) {
            Some(parameter) => f.write_str(&parameter.name),
            None => write!(f, "${}", id.0),
        },
        Term::Synthetic(token) => match token.kind {
            ParamKind::Type => write!(f, "U{}", token.id),
            ParamKind::Value => write!(f, "V{}", token.id),
            ParamKind::Nested => write!(f, "TT{}", token.id),
        },
        Term::Type(name) | Term::Template(name) => write!(f, "{name}"),
        Term::Value { value, .. } => write!(f, "{value}"),
        Term::Apply { head, args } => {
            write_term(f, head, parameters)?;
            f.write_str("<")?;
            write_list(f, args, parameters)?;
            f.write_str(">")
        }
        Term::Pointer(inner) => {
            write_term(f, inner, parameters)?;
            f.write_str("*")
        }
        Term::Qualified { quals, inner } => {
            if matches!(**inner, Term::Pointer(_)) {
                write_term(f, inner, parameters)?;
                write!(f, " {quals}")
            } else {
                write!(f, "{quals} ")?;
                write_term(f, inner, parameters)
            }
        }
        Term::Reference { kind, inner } => {
            write_term(f, inner, parameters)?;
            match kind {
                RefKind::Lvalue => f.write_str("&"),
                RefKind::Rvalue => f.write_str("&&"),
            }
        }
        Term::Expansion(inner) => {
            write_term(f, inner, parameters)?;
            f.write_str("...")
        }
        Term::Offset { base, delta } => {
            write_term(f, base, parameters)?;
            if *delta < 0 {
                write!(f, "{delta}")
            } else {
                write!(f, "+{delta}")
            }
        }
    }
}

/// One position of a pattern's argument list
#[derive(Debug, Clone, PartialEq)]
pub struct ArgSlot {
    pub term: Term,
    /// Default argument used when a call site supplies fewer arguments
    pub default: Option<Term>,
}

impl ArgSlot {
    pub fn new(term: Term) -> Self {
        Self {
            term,
            default: None,
        }
    }

    pub fn with_default(mut self, default: Term) -> Self {
        self.default = Some(default);
        self
    }

    pub fn is_expansion(&self) -> bool {
        matches!(self.term, Term::Expansion(_))
    }
}

impl From<Term> for ArgSlot {
    fn from(term: Term) -> Self {
        ArgSlot::new(term)
    }
}

/// Role of a pattern within its family
#[derive(Debug, Clone, PartialEq)]
pub enum PatternKind {
    /// Class-like primary; its argument list is its parameter list
    Primary,
    /// Function-like primary; one of possibly many overloads
    Overload,
    /// Partial specialization of a class-like primary
    Partial { of: PatternId },
    /// Explicit (full) specialization; `template_args` substitute the specialized
    /// pattern's parameters and are deduced at registration when left empty
    Explicit {
        of: PatternId,
        template_args: Vec<Term>,
    },
}

/// A named, parameterized signature
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub arguments: Vec<ArgSlot>,
    pub kind: PatternKind,
}

impl Pattern {
    /// Class-like primary, e.g. `template<typename T1, typename T2> class B`
    pub fn primary(name: impl Into<String>, parameters: Vec<Parameter>) -> Self {
        let arguments = parameters
            .iter()
            .enumerate()
            .map(|(index, parameter)| {
                let term = Term::param(index as u32);
                ArgSlot::new(if parameter.pack {
                    Term::expand(term)
                } else {
                    term
                })
            })
            .collect();
        Self {
            name: name.into(),
            parameters,
            arguments,
            kind: PatternKind::Primary,
        }
    }

    /// Function-like primary, e.g. `template<typename T> void f(T*, int = 5)`
    pub fn overload(
        name: impl Into<String>,
        parameters: Vec<Parameter>,
        arguments: Vec<ArgSlot>,
    ) -> Self {
        Self {
            name: name.into(),
            parameters,
            arguments,
            kind: PatternKind::Overload,
        }
    }

    /// Partial specialization, e.g. `template<typename T> class B<T, int>`
    pub fn partial(
        name: impl Into<String>,
        of: PatternId,
        parameters: Vec<Parameter>,
        arguments: Vec<Term>,
    ) -> Self {
        Self {
            name: name.into(),
            parameters,
            arguments: arguments.into_iter().map(ArgSlot::new).collect(),
            kind: PatternKind::Partial { of },
        }
    }

    /// Explicit specialization given by its template arguments, e.g. `f<int, int*>`
    pub fn explicit(name: impl Into<String>, of: PatternId, template_args: Vec<Term>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            arguments: Vec::new(),
            kind: PatternKind::Explicit { of, template_args },
        }
    }

    /// Explicit specialization given by its argument list; template arguments are deduced
    pub fn explicit_for(name: impl Into<String>, of: PatternId, arguments: Vec<Term>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            arguments: arguments.into_iter().map(ArgSlot::new).collect(),
            kind: PatternKind::Explicit {
                of,
                template_args: Vec::new(),
            },
        }
    }

    pub fn parameter(&self, id: ParamId) -> Option<&Parameter> {
        self.parameters.get(id.index())
    }

    pub fn argument_terms(&self) -> Vec<Term> {
        self.arguments.iter().map(|slot| slot.term.clone()).collect()
    }

    pub fn has_pack_expansion(&self) -> bool {
        self.arguments.iter().any(ArgSlot::is_expansion)
    }

    pub fn is_explicit(&self) -> bool {
        matches!(self.kind, PatternKind::Explicit { .. })
    }

    /// The pattern this one specializes, if any
    pub fn specializes(&self) -> Option<PatternId> {
        match &self.kind {
            PatternKind::Partial { of } | PatternKind::Explicit { of, .. } => Some(*of),
            PatternKind::Primary | PatternKind::Overload => None,
        }
    }

    /// Declaration-like rendering, e.g. `template<typename T> B<T, int>`
    pub fn signature(&self) -> String {
        let params = self
            .parameters
            .iter()
            .map(|parameter| parameter.declaration(&self.parameters))
            .collect::<Vec<_>>()
            .join(", ");
        let args = self
            .arguments
            .iter()
            .map(|slot| match &slot.default {
                Some(default) => format!(
                    "{} = {}",
                    slot.term.display(&self.parameters),
                    default.display(&self.parameters)
                ),
                None => slot.term.display(&self.parameters).to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ");
        match &self.kind {
            PatternKind::Primary => format!("template<{params}> {}", self.name),
            PatternKind::Partial { .. } => format!("template<{params}> {}<{args}>", self.name),
            PatternKind::Overload => format!("template<{params}> {}({args})", self.name),
            PatternKind::Explicit { template_args, .. } => {
                let template_args = template_args
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("template<> {}<{template_args}>({args})", self.name)
            }
        }
    }
}

/// What a parameter is bound to
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Single(Term),
    /// Elements bound to a pack; an element may itself be an (unexpanded) expansion
    Pack(Vec<Term>),
}

/// Qualifiers a use-site argument had to gain to bind to a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualificationConversion {
    /// Argument position at the use-site
    pub position: usize,
    pub added: Qualifiers,
}

/// Parameter bindings discovered by the matcher, plus the conversions they needed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Substitution {
    bindings: IndexMap<ParamId, Binding>,
    conversions: Vec<QualificationConversion>,
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: ParamId, binding: Binding) {
        self.bindings.insert(id, binding);
    }

    pub fn get(&self, id: ParamId) -> Option<&Binding> {
        self.bindings.get(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn bindings(&self) -> impl Iterator<Item = (ParamId, &Binding)> {
        self.bindings.iter().map(|(id, binding)| (*id, binding))
    }

    pub fn conversions(&self) -> &[QualificationConversion] {
        &self.conversions
    }

    pub fn record_conversion(&mut self, conversion: QualificationConversion) {
        self.conversions.push(conversion);
    }

    pub fn has_conversion_at(&self, position: usize) -> bool {
        self.conversions
            .iter()
            .any(|conversion| conversion.position == position)
    }

    /// Bound values flattened in parameter order, `None` if a parameter is unbound
    pub fn flatten(&self, parameter_count: usize) -> Option<Vec<Term>> {
        let mut values = Vec::with_capacity(parameter_count);
        for index in 0..parameter_count {
            match self.get(ParamId(index as u32))? {
                Binding::Single(term) => values.push(term.clone()),
                Binding::Pack(elements) => values.extend(elements.iter().cloned()),
            }
        }
        Some(values)
    }

    /// Apply this substitution to a term; unbound parameters are left in place
    pub fn apply(&self, term: &Term) -> Term {
        match term {
            Term::Param(id) => match self.get(*id) {
                Some(Binding::Single(bound)) => bound.clone(),
                _ => term.clone(),
            },
            Term::Apply { head, args } => Term::apply_to(self.apply(head), self.apply_list(args)),
            Term::Pointer(inner) => Term::pointer(self.apply(inner)),
            Term::Qualified { quals, inner } => Term::cv(*quals, self.apply(inner)),
            Term::Reference { kind, inner } => Term::reference(*kind, self.apply(inner)),
            Term::Expansion(inner) => Term::expand(self.apply(inner)),
            Term::Offset { base, delta } => Term::offset(self.apply(base), *delta),
            Term::Synthetic(_) | Term::Type(_) | Term::Value { .. } | Term::Template(_) => {
                term.clone()
            }
        }
    }

    /// Apply to an argument list, expanding pack expansions whose pack is bound
    pub fn apply_list(&self, terms: &[Term]) -> Vec<Term> {
        let mut applied = Vec::with_capacity(terms.len());
        for term in terms {
            let Term::Expansion(inner) = term else {
                applied.push(self.apply(term));
                continue;
            };
            let Some((pack, elements)) = self.bound_pack(inner) else {
                applied.push(self.apply(term));
                continue;
            };
            for element in elements {
                let mut overlay = self.clone();
                match element {
                    Term::Expansion(element) => {
                        overlay.insert(pack, Binding::Single((**element).clone()));
                        applied.push(Term::expand(overlay.apply(inner)));
                    }
                    element => {
                        overlay.insert(pack, Binding::Single(element.clone()));
                        applied.push(overlay.apply(inner));
                    }
                }
            }
        }
        applied
    }

    fn bound_pack(&self, inner: &Term) -> Option<(ParamId, &[Term])> {
        inner
            .parameters()
            .into_iter()
            .find_map(|id| match self.get(id) {
                Some(Binding::Pack(elements)) => Some((id, elements.as_slice())),
                _ => None,
            })
    }

    /// Renders the bindings as `T = int, Ts = {char, bool}`
    pub fn describe(&self, parameters: &[Parameter]) -> String {
        self.bindings
            .iter()
            .map(|(id, binding)| {
                let name = parameters
                    .get(id.index())
                    .map_or_else(|| format!("${}", id.0), |p| p.name.clone());
                match binding {
                    Binding::Single(term) => format!("{name} = {term}"),
                    Binding::Pack(elements) => format!(
                        "{name} = {{{}}}",
                        elements
                            .iter()
                            .map(ToString::to_string)
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A use-site to resolve
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub name: String,
    /// Concrete arguments; `Reference { kind: Lvalue, .. }` marks an lvalue argument
    pub arguments: Vec<Term>,
    /// Explicitly supplied template arguments, bound positionally
    pub explicit_arguments: Vec<Term>,
    /// Skip explicit specializations
    pub primary_only: bool,
}

impl Query {
    pub fn new(name: impl Into<String>, arguments: Vec<Term>) -> Self {
        Self {
            name: name.into(),
            arguments,
            explicit_arguments: Vec::new(),
            primary_only: false,
        }
    }

    pub fn with_explicit_arguments(mut self, explicit_arguments: Vec<Term>) -> Self {
        self.explicit_arguments = explicit_arguments;
        self
    }

    pub fn primary_only(mut self) -> Self {
        self.primary_only = true;
        self
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.explicit_arguments.is_empty() {
            f.write_str("<")?;
            write_list(f, &self.explicit_arguments, &[])?;
            f.write_str(">")?;
        }
        f.write_str("(")?;
        write_list(f, &self.arguments, &[])?;
        f.write_str(")")
    }
}
