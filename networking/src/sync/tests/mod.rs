mod states_tests;
