include!("loomdb.rs");
