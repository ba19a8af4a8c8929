pub mod closed_form;
pub mod implied;
pub mod vol_node;
