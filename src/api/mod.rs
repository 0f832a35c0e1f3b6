pub mod finder;
