/// Runnable burn, EOS and diagnostic scenarios, selected by task number.
pub mod burn_examples;
