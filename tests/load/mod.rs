mod concurrent_joins;
