pub mod build;
pub mod cleanup;
pub mod llvm;
pub mod prepare;
pub mod publish;
pub mod stop;
