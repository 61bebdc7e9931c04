mod test_endpoint;
