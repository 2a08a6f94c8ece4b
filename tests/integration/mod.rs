mod match_lifecycle;
