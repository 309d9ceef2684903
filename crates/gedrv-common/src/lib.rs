pub mod dcommon;
