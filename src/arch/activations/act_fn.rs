use super::{Relu, Sigmoid, Tanh};

/// An elementwise activation function together with its derivative.
#[derive(Clone, Copy, Debug)]
pub enum ActFn {
    Sigmoid(Sigmoid),
    Relu(Relu),
    Tanh(Tanh),
}

impl ActFn {
    pub fn sigmoid(amp: f32) -> Self {
        ActFn::Sigmoid(Sigmoid::new(amp))
    }

    pub fn relu() -> Self {
        ActFn::Relu(Relu::new())
    }

    pub fn tanh() -> Self {
        ActFn::Tanh(Tanh::new())
    }

    pub fn f(&self, z: f32) -> f32 {
        match self {
            ActFn::Sigmoid(a) => a.f(z),
            ActFn::Relu(a) => a.f(z),
            ActFn::Tanh(a) => a.f(z),
        }
    }

    pub fn df(&self, z: f32) -> f32 {
        match self {
            ActFn::Sigmoid(a) => a.df(z),
            ActFn::Relu(a) => a.df(z),
            ActFn::Tanh(a) => a.df(z),
        }
    }
}
