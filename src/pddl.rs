// Copyright 2025 Cornell University
// released under MIT License

//! # Planning IR
//! A small typed representation of the domain and problem the encoder
//! produces. Text is only ever produced from these values (see
//! `serialize`), so every emitted expression is balanced by construction.

/// `?x ?y - tpe`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedList {
    pub names: Vec<String>,
    pub tpe: Option<String>,
}

impl TypedList {
    pub fn new<S: ToString>(names: &[S], tpe: &str) -> Self {
        Self {
            names: names.iter().map(|n| n.to_string()).collect(),
            tpe: Some(tpe.to_string()),
        }
    }

    /// names without a parent type, e.g. `activity automaton` in `:types`
    pub fn untyped<S: ToString>(names: &[S]) -> Self {
        Self {
            names: names.iter().map(|n| n.to_string()).collect(),
            tpe: None,
        }
    }
}

/// shorthand for a parameter list built from `(names, type)` pairs
pub fn params(groups: &[(&[&str], &str)]) -> Vec<TypedList> {
    groups
        .iter()
        .map(|(names, tpe)| TypedList::new(names, tpe))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Formula {
    /// `(pred arg*)`
    Atom(String, Vec<String>),
    Not(Box<Formula>),
    And(Vec<Formula>),
    Imply(Box<Formula>, Box<Formula>),
    Forall(Vec<TypedList>, Box<Formula>),
    When(Box<Formula>, Box<Formula>),
    /// `(increase (fluent) amount)`
    Increase(String, u32),
    /// `(= (fluent) value)`, used to initialise numeric fluents
    FluentEq(String, u32),
}

impl Formula {
    pub fn atom<S: ToString>(pred: &str, args: &[S]) -> Self {
        Formula::Atom(pred.to_string(), args.iter().map(|a| a.to_string()).collect())
    }

    pub fn not(inner: Formula) -> Self {
        Formula::Not(Box::new(inner))
    }

    pub fn and(conjuncts: Vec<Formula>) -> Self {
        Formula::And(conjuncts)
    }

    pub fn imply(lhs: Formula, rhs: Formula) -> Self {
        Formula::Imply(Box::new(lhs), Box::new(rhs))
    }

    pub fn forall(vars: Vec<TypedList>, body: Formula) -> Self {
        Formula::Forall(vars, Box::new(body))
    }

    pub fn when(cond: Formula, effect: Formula) -> Self {
        Formula::When(Box::new(cond), Box::new(effect))
    }

    /// `true` if the formula is printed on a single line
    pub fn is_simple(&self) -> bool {
        match self {
            Formula::Atom(..) | Formula::Increase(..) | Formula::FluentEq(..) => true,
            Formula::Not(inner) => inner.is_simple(),
            Formula::And(conjuncts) => conjuncts.iter().all(Formula::is_simple),
            Formula::Imply(lhs, rhs) => lhs.is_simple() && rhs.is_simple(),
            Formula::Forall(..) | Formula::When(..) => false,
        }
    }

    /// Sum of the `(increase ...)` amounts in this formula
    pub fn cost(&self) -> u32 {
        match self {
            Formula::Increase(_, amount) => *amount,
            Formula::Atom(..) | Formula::FluentEq(..) => 0,
            Formula::Not(inner) => inner.cost(),
            Formula::And(conjuncts) => conjuncts.iter().map(Formula::cost).sum(),
            Formula::Imply(lhs, rhs) | Formula::When(lhs, rhs) => lhs.cost() + rhs.cost(),
            Formula::Forall(_, body) => body.cost(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub name: String,
    pub params: Vec<TypedList>,
}

impl Predicate {
    pub fn new(name: &str, params: Vec<TypedList>) -> Self {
        Self {
            name: name.to_string(),
            params,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub name: String,
    pub params: Vec<TypedList>,
    pub precondition: Formula,
    pub effect: Formula,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Domain {
    pub name: String,
    pub requirements: Vec<String>,
    /// `:types` entries, each a group of sub types with an optional parent
    pub types: Vec<TypedList>,
    pub predicates: Vec<Predicate>,
    pub functions: Vec<String>,
    pub actions: Vec<Action>,
}

impl Domain {
    pub fn action(&self, name: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    pub name: String,
    pub domain: String,
    /// `(object, type)` in emission order
    pub objects: Vec<(String, &'static str)>,
    pub init: Vec<Formula>,
    pub goal: Vec<Formula>,
    /// numeric fluent that is minimized
    pub metric: String,
}

impl Problem {
    pub fn objects_of_type<'a>(&'a self, tpe: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.objects
            .iter()
            .filter(move |(_, t)| *t == tpe)
            .map(|(name, _)| name.as_str())
    }
}
