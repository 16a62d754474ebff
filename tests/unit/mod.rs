mod multistatus_tests;
mod xml_body_tests;
