mod unit {
    mod entities_tests;
    mod value_objects_tests;
}
