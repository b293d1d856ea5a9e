//! Structured representation of the generated Move module.
//!
//! The builder decides *what* the module contains; `emit` decides how it is
//! printed. Only the subset of Move the graph module needs is modelled.

/// A Move module: `module <address>::<name> { ... }`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveModule {
    pub address: String,
    pub name: String,
    /// Fully qualified `use` paths, printed in order.
    pub uses: Vec<String>,
    pub functions: Vec<Function>,
    /// Layers that get chunked-computation state at initialization
    /// (every layer but the last).
    pub chunked_layers: Vec<String>,
}

impl MoveModule {
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    /// `public fun`
    Public,
    /// `public entry fun`
    PublicEntry,
    /// `entry public fun`
    EntryPublic,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Function {
    pub visibility: Visibility,
    pub name: String,
    pub params: Vec<Param>,
    pub returns: Vec<Type>,
    /// Statement groups, printed separated by blank lines.
    pub blocks: Vec<Vec<Stmt>>,
    /// Trailing expression returned from the body.
    pub tail: Option<Expr>,
}

impl Function {
    /// All statements across blocks, in order.
    pub fn statements(&self) -> impl Iterator<Item = &Stmt> {
        self.blocks.iter().flatten()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub ty: Type,
}

impl Param {
    pub fn new(name: &str, ty: Type) -> Self {
        Self {
            name: name.to_string(),
            ty,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Type {
    U64,
    /// `vector<u8>`
    Bytes,
    /// `vector<u64>`
    U64Vector,
    /// A path such as `graph::SignedFixedGraph`.
    Named(String),
    Ref(Box<Type>),
    MutRef(Box<Type>),
}

impl Type {
    pub fn named(path: &str) -> Self {
        Type::Named(path.to_string())
    }

    pub fn by_ref(self) -> Self {
        Type::Ref(Box::new(self))
    }

    pub fn by_mut_ref(self) -> Self {
        Type::MutRef(Box::new(self))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Stmt {
    /// `let [mut] x = value;` or `let (a, b, c) = value;`
    Let {
        names: Vec<String>,
        mutable: bool,
        value: Expr,
    },
    /// `expr;`
    Expr(Expr),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expr {
    Var(String),
    U64(u64),
    /// `b"..."`
    ByteString(String),
    /// `vector[a, b, c]`
    Vector(Vec<u64>),
    Call { func: String, args: Vec<Expr> },
    Borrow { mutable: bool, expr: Box<Expr> },
    Tuple(Vec<Expr>),
}

impl Expr {
    pub fn var(name: &str) -> Self {
        Expr::Var(name.to_string())
    }

    pub fn vars(names: &[&str]) -> Vec<Self> {
        names.iter().map(|n| Expr::var(n)).collect()
    }

    pub fn call(func: &str, args: Vec<Expr>) -> Self {
        Expr::Call {
            func: func.to_string(),
            args,
        }
    }

    pub fn borrow_mut(name: &str) -> Self {
        Expr::Borrow {
            mutable: true,
            expr: Box::new(Expr::var(name)),
        }
    }

    pub fn borrow(name: &str) -> Self {
        Expr::Borrow {
            mutable: false,
            expr: Box::new(Expr::var(name)),
        }
    }
}
