mod lbfgs;

pub use lbfgs::Lbfgs;
