//! UK/SA tax residency rules: the UK Statutory Residence Test, the SA physical presence test,
//! UK deemed domicile, and double taxation relief under the UK/SA treaty.
//!
//! Every evaluator is a pure function over its inputs and a [`tax::RulesConfig`]; history and
//! result storage are reached through the traits in [`history`] and [`store`].

pub mod history;
pub mod store;
pub mod tax;
