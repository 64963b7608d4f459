pub(crate) mod exit;
pub(crate) mod time;
