pub(crate) mod feature;
pub(crate) mod table;
